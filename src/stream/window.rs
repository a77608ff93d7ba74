//! Sliding-window framework for frame-based (spectral) transforms.
//!
//! [`WindowStream`] owns an overlap-add output buffer of `window_size`
//! samples. Each time its pending output runs dry it shifts the buffer left
//! by `hop`, zeroes the freshly exposed tail, and asks its [`FrameSource`] to
//! add one frame. Only the oldest `hop` samples are complete after that, so
//! only those are handed to the caller.

use super::traits::{Element, Sample, Stream, StreamBox};
use crate::error::Error;

/// Produces overlapping frames for a [`WindowStream`].
pub trait FrameSource {
    /// Overlap-add one frame into `output` (length `window_size`, tail of
    /// `hop` samples already zeroed). Returns `false` once no further frame
    /// can be produced.
    fn produce_frame(&mut self, output: &mut [Sample]) -> Result<bool, Error>;

    /// Total output length, when known.
    fn length(&self) -> Option<usize>;
}

#[derive(Debug, Clone)]
pub struct WindowStream<F> {
    source: F,
    output: Vec<Sample>,
    hop: usize,
    /// Samples at the front of `output` that are ready to be served.
    pending: usize,
    remaining: usize,
    frames: usize,
    exhausted: bool,
    ended: bool,
}

impl<F: FrameSource> WindowStream<F> {
    /// `hop` is clamped to `1..=window_size`.
    pub fn new(source: F, window_size: usize, hop: usize) -> Self {
        let window_size = window_size.max(1);
        WindowStream {
            source,
            output: vec![0.0; window_size],
            hop: hop.clamp(1, window_size),
            pending: 0,
            remaining: 0,
            frames: 0,
            exhausted: false,
            ended: false,
        }
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    /// Advance to the next frame. Returns `false` when there is nothing left
    /// to serve.
    fn advance(&mut self) -> Result<bool, Error> {
        if self.exhausted {
            return Ok(false);
        }

        let size = self.output.len();
        self.output.copy_within(self.hop.., 0);
        self.output[size - self.hop..].fill(0.0);

        if self.source.produce_frame(&mut self.output)? {
            self.frames += 1;
            self.pending = self.hop;
        } else {
            // drain the overlap that earlier frames already accumulated
            self.exhausted = true;
            self.pending = if self.frames > 0 { size - self.hop } else { 0 };
        }
        self.remaining = self.pending;
        Ok(self.pending > 0)
    }
}

impl<F: FrameSource + Clone + 'static> Stream<Sample> for WindowStream<F> {
    fn read(&mut self, out: &mut [Sample]) -> Result<Option<usize>, Error> {
        if self.ended {
            return Ok(None);
        }
        if self.remaining == 0 && !self.advance()? {
            self.ended = true;
            return Ok(None);
        }

        let start = self.pending - self.remaining;
        let n = out.len().min(self.remaining);
        out[..n].copy_from_slice(&self.output[start..start + n]);
        self.remaining -= n;
        Ok(Some(n))
    }

    fn length(&self) -> Option<usize> {
        self.source.length()
    }

    fn box_clone(&self) -> StreamBox<Sample> {
        StreamBox::new(self.clone())
    }
}

/// Input accumulator holding the most recent `size` raw samples of a stream.
#[derive(Debug, Clone)]
pub struct Windower<T> {
    buffer: Vec<T>,
}

impl<T: Element> Windower<T> {
    pub fn new(size: usize) -> Self {
        Windower {
            buffer: vec![T::default(); size],
        }
    }

    pub fn buffer(&self) -> &[T] {
        &self.buffer
    }

    /// Shift out the oldest `n` samples and read `n` fresh ones into the
    /// tail. Returns how many fresh samples were actually read.
    pub fn read_from<S: Stream<T> + ?Sized>(
        &mut self,
        stream: &mut S,
        n: usize,
    ) -> Result<usize, Error> {
        let size = self.buffer.len();
        let n = n.min(size);
        self.buffer.copy_within(n.., 0);
        stream.read_full(&mut self.buffer[size - n..])
    }
}
