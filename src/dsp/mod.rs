//! Sample transforms and the WAV renderer.
//!
//! Every transform is itself a [`Stream`](crate::stream::Stream) wrapping the
//! streams it reads from, so a pipeline is just a nested chain of them.

pub mod mel;
pub mod mix;
pub mod mute;
pub mod renderer;
pub mod resample;
pub mod vocoder;

pub use mel::MelFilterBank;
pub use mix::Mix;
pub use mute::Mute;
pub use renderer::{FileSink, OutputSink, render_wav};
pub use resample::Resample;
pub use vocoder::{Vocoder, VocoderFrames};
