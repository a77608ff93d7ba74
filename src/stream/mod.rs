//! Pull-based streams: the core abstraction plus the byte and PCM sources
//! every transform is built on.
//!
//! A pipeline is a chain of [`Stream`]s owned through [`StreamBox`]. Reads are
//! synchronous and driven from the outermost stream; nothing runs until the
//! renderer pulls.

pub mod buffered;
pub mod file;
pub mod memory;
pub mod traits;
pub mod wav;
pub mod window;

pub use buffered::BufferedStream;
pub use file::FileStream;
pub use memory::MemoryStream;
pub use traits::{Element, Sample, Stream, StreamBox};
pub use wav::{WavHeader, WavStream};
pub use window::{FrameSource, WindowStream, Windower};
