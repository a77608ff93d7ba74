//! Slot array and operation execution.
//!
//! Tracks are numbered from 1. Slot 1 is the main track: every operation
//! wraps it and stores the result back into slot 1, so the main slot is only
//! ever replaced. Any other slot an operation references is moved into the
//! new stream and stays empty afterwards.

use std::mem;
use std::path::Path;

use tracing::debug;

use crate::ast::{Operation, Step};
use crate::dsp::mix::Mix;
use crate::dsp::mute::Mute;
use crate::dsp::renderer::{OutputSink, render_wav};
use crate::dsp::resample::Resample;
use crate::dsp::vocoder::VocoderFrames;
use crate::error::{ConfigError, Error};
use crate::settings::PipelineSettings;
use crate::stream::wav::SAMPLE_RATE;
use crate::stream::{FileStream, MemoryStream, Sample, Stream, StreamBox, WavStream};

/// A set of input tracks being rewired by operations.
///
/// A pipeline that returned an error from [`Pipeline::apply`] may have lost
/// its main track and should be discarded.
#[derive(Debug)]
pub struct Pipeline {
    main: StreamBox<Sample>,
    /// Slots 2.., `None` once consumed.
    others: Vec<Option<StreamBox<Sample>>>,
    settings: PipelineSettings,
}

fn seconds(s: u64) -> usize {
    usize::try_from(s)
        .unwrap_or(usize::MAX)
        .saturating_mul(SAMPLE_RATE as usize)
}

impl Pipeline {
    /// The first track becomes slot 1.
    pub fn new(tracks: Vec<StreamBox<Sample>>, settings: PipelineSettings) -> Result<Self, Error> {
        settings.validate()?;
        let mut tracks = tracks.into_iter();
        let Some(main) = tracks.next() else {
            return Err(ConfigError::NoTracks.into());
        };
        Ok(Pipeline {
            main,
            others: tracks.map(Some).collect(),
            settings,
        })
    }

    /// Open WAV files as tracks. Headers are validated here, so a bad input
    /// fails before any operation runs.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], settings: PipelineSettings) -> Result<Self, Error> {
        let mut tracks = Vec::with_capacity(paths.len());
        for path in paths {
            let mut wav = WavStream::new(FileStream::new(path.as_ref()));
            wav.prepare()?;
            debug!(path = %path.as_ref().display(), slot = tracks.len() + 1, "loaded track");
            tracks.push(StreamBox::new(wav));
        }
        Self::new(tracks, settings)
    }

    /// Like [`Pipeline::from_paths`] for WAV files already in memory.
    pub fn from_wav_bytes(inputs: Vec<Vec<u8>>, settings: PipelineSettings) -> Result<Self, Error> {
        let mut tracks = Vec::with_capacity(inputs.len());
        for bytes in inputs {
            let mut wav = WavStream::new(MemoryStream::new(bytes));
            wav.prepare()?;
            tracks.push(StreamBox::new(wav));
        }
        Self::new(tracks, settings)
    }

    /// Number of slots, consumed ones included.
    pub fn track_count(&self) -> usize {
        self.others.len() + 1
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Whether a slot still holds a track.
    pub fn is_available(&self, slot: usize) -> bool {
        match slot {
            0 => false,
            1 => true,
            n => matches!(self.others.get(n - 2), Some(Some(_))),
        }
    }

    /// Slot 1 is cloned since the main slot can't be emptied; any other slot
    /// is moved out.
    fn take_slot(&mut self, slot: usize) -> Result<StreamBox<Sample>, ConfigError> {
        let len = self.track_count();
        match slot {
            0 => Err(ConfigError::SlotZero),
            1 => Ok(self.main.clone()),
            n if n > len => Err(ConfigError::SlotOutOfRange { slot: n, len }),
            n => {
                let track = self.others[n - 2].take().ok_or(ConfigError::SlotEmpty(n))?;
                debug!(slot = n, "slot consumed");
                Ok(track)
            }
        }
    }

    fn take_main(&mut self) -> StreamBox<Sample> {
        mem::replace(&mut self.main, StreamBox::new(MemoryStream::new(Vec::<Sample>::new())))
    }

    /// Apply one operation to the main track.
    pub fn apply(&mut self, op: &Operation) -> Result<(), Error> {
        let chunk = self.settings.chunk_size;
        self.main = match *op {
            Operation::Mix { slot, insert_at } => {
                let other = self.take_slot(slot)?;
                StreamBox::new(Mix::new(self.take_main(), other, seconds(insert_at), chunk))
            }
            Operation::Mute { start, end } => {
                StreamBox::new(Mute::new(self.take_main(), seconds(start), seconds(end)))
            }
            Operation::Resample { percent } => {
                if percent == 0 {
                    return Err(ConfigError::ZeroFactor.into());
                }
                let factor = percent as f64 / 100.0;
                StreamBox::new(Resample::new(self.take_main(), factor, chunk)?)
            }
            Operation::Vocoder { slot } => {
                let carrier = self.take_slot(slot)?;
                let frames = VocoderFrames::new(self.take_main(), carrier, &self.settings.vocoder);
                StreamBox::new(frames.into_stream())
            }
        };
        debug!(operation = %op, length = ?self.main.length(), "applied operation");
        Ok(())
    }

    pub fn run<'a>(&mut self, ops: impl IntoIterator<Item = &'a Operation>) -> Result<(), Error> {
        for op in ops {
            self.apply(op)?;
        }
        Ok(())
    }

    /// Like [`Pipeline::run`], reporting configuration errors at the line
    /// and column of the failing step.
    pub fn run_script(&mut self, steps: &[Step]) -> Result<(), Error> {
        for step in steps {
            self.apply(&step.operation).map_err(|e| match e {
                Error::Config(source) => Error::Script {
                    line: step.span.line,
                    column: step.span.column,
                    source,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    /// The finished main track.
    pub fn into_output(self) -> StreamBox<Sample> {
        self.main
    }

    /// Encode the main track as WAV into `sink`. Returns the number of samples
    /// written.
    pub fn render<O: OutputSink + ?Sized>(
        self,
        sink: &mut O,
        on_progress: impl FnMut(f32),
    ) -> Result<usize, Error> {
        let chunk = self.settings.chunk_size;
        let mut output = self.main;
        render_wav(&mut output, sink, chunk, on_progress)
    }
}
