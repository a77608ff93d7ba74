//! Silences a range of samples.

use crate::error::Error;
use crate::stream::{Sample, Stream, StreamBox};

/// Zeroes every sample whose absolute index lies in `[start, end)`. A
/// reversed range mutes nothing.
#[derive(Debug, Clone)]
pub struct Mute<S> {
    inner: S,
    start: usize,
    end: usize,
    offset: usize,
}

impl<S: Stream<Sample>> Mute<S> {
    pub fn new(inner: S, start: usize, end: usize) -> Self {
        Mute {
            inner,
            start,
            end,
            offset: 0,
        }
    }
}

impl<S: Stream<Sample> + Clone + 'static> Stream<Sample> for Mute<S> {
    fn read(&mut self, out: &mut [Sample]) -> Result<Option<usize>, Error> {
        let Some(n) = self.inner.read(out)? else {
            return Ok(None);
        };

        let from = self.start.clamp(self.offset, self.offset + n);
        let to = self.end.clamp(from, self.offset + n);
        out[from - self.offset..to - self.offset].fill(0.0);

        self.offset += n;
        Ok(Some(n))
    }

    fn length(&self) -> Option<usize> {
        self.inner.length()
    }

    fn box_clone(&self) -> StreamBox<Sample> {
        StreamBox::new(self.clone())
    }
}
