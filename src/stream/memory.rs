//! In-memory stream over shared, immutable data.

use std::sync::Arc;

use super::traits::{Element, Stream, StreamBox};
use crate::error::Error;

/// Serves a shared slice. Clones share the data and keep their own cursor.
#[derive(Debug, Clone)]
pub struct MemoryStream<T> {
    data: Arc<[T]>,
    pos: usize,
}

impl<T: Element> MemoryStream<T> {
    pub fn new(data: impl Into<Arc<[T]>>) -> Self {
        MemoryStream {
            data: data.into(),
            pos: 0,
        }
    }

    /// Elements not read yet.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl<T: Element> Stream<T> for MemoryStream<T> {
    fn read(&mut self, buf: &mut [T]) -> Result<Option<usize>, Error> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(Some(n))
    }

    fn skip(&mut self, n: usize) -> Result<usize, Error> {
        let n = n.min(self.remaining());
        self.pos += n;
        Ok(n)
    }

    fn length(&self) -> Option<usize> {
        Some(self.data.len())
    }

    fn box_clone(&self) -> StreamBox<T> {
        StreamBox::new(self.clone())
    }
}
