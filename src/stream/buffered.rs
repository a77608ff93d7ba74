//! Read-ahead buffering for streams that are consumed in tiny pieces.

use super::traits::{Element, Stream, StreamBox};
use crate::error::Error;

/// Pulls fixed-size chunks from `inner` and serves requests out of them.
///
/// A refill that comes back short means `inner` is done: what was buffered
/// is still handed out, but `inner` is never read again.
#[derive(Debug, Clone)]
pub struct BufferedStream<T, S> {
    inner: S,
    buffer: Vec<T>,
    len: usize,
    offset: usize,
    inner_ended: bool,
    ended: bool,
}

impl<T: Element, S: Stream<T>> BufferedStream<T, S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        BufferedStream {
            inner,
            buffer: vec![T::default(); capacity.max(1)],
            len: 0,
            offset: 0,
            inner_ended: false,
            ended: false,
        }
    }

    fn refill(&mut self) -> Result<bool, Error> {
        if self.inner_ended {
            return Ok(false);
        }
        let r = self.inner.read_full(&mut self.buffer)?;
        if r < self.buffer.len() {
            self.inner_ended = true;
        }
        self.len = r;
        self.offset = 0;
        Ok(r > 0)
    }
}

impl<T: Element, S: Stream<T> + Clone + 'static> Stream<T> for BufferedStream<T, S> {
    fn read(&mut self, out: &mut [T]) -> Result<Option<usize>, Error> {
        if self.ended {
            return Ok(None);
        }
        if self.offset == self.len && !self.refill()? {
            self.ended = true;
            return Ok(None);
        }

        let n = (self.len - self.offset).min(out.len());
        out[..n].copy_from_slice(&self.buffer[self.offset..self.offset + n]);
        self.offset += n;
        Ok(Some(n))
    }

    fn read_single(&mut self) -> Result<Option<T>, Error> {
        if self.offset < self.len {
            let value = self.buffer[self.offset];
            self.offset += 1;
            return Ok(Some(value));
        }
        let mut one = [T::default()];
        Ok(match self.read(&mut one)? {
            Some(1) => Some(one[0]),
            _ => None,
        })
    }

    fn length(&self) -> Option<usize> {
        self.inner.length()
    }

    fn box_clone(&self) -> StreamBox<T> {
        StreamBox::new(self.clone())
    }
}
