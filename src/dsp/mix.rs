//! Averaging mix of two tracks.

use crate::error::Error;
use crate::stream::{Sample, Stream, StreamBox};

/// Passes `main` through for the first `insert_at` samples, then emits
/// `(main + other) * 0.5` in lock-step. Once `other` runs dry the rest of
/// `main` passes through untouched; the mix ends with `main`.
#[derive(Debug, Clone)]
pub struct Mix<A, B> {
    main: A,
    other: B,
    other_buffer: Vec<Sample>,
    insert_remaining: usize,
    main_ended: bool,
    other_ended: bool,
}

impl<A: Stream<Sample>, B: Stream<Sample>> Mix<A, B> {
    pub fn new(main: A, other: B, insert_at: usize, chunk_size: usize) -> Self {
        Mix {
            main,
            other,
            other_buffer: vec![0.0; chunk_size.max(1)],
            insert_remaining: insert_at,
            main_ended: false,
            other_ended: false,
        }
    }
}

impl<A, B> Stream<Sample> for Mix<A, B>
where
    A: Stream<Sample> + Clone + 'static,
    B: Stream<Sample> + Clone + 'static,
{
    fn read(&mut self, out: &mut [Sample]) -> Result<Option<usize>, Error> {
        if self.insert_remaining > 0 {
            let n = out.len().min(self.insert_remaining);
            let r = self.main.read(&mut out[..n])?;
            match r {
                Some(r) => self.insert_remaining -= r,
                None => self.main_ended = true,
            }
            return Ok(r);
        }
        if self.main_ended {
            return Ok(None);
        }

        let n = out.len().min(self.other_buffer.len());
        let out = &mut out[..n];
        let r = self.main.read_full(out)?;
        if r < out.len() {
            self.main_ended = true;
            if r == 0 {
                return Ok(None);
            }
        }
        if self.other_ended {
            return Ok(Some(r));
        }

        let got = self.other.read_full(&mut self.other_buffer[..r])?;
        if got < r {
            self.other_ended = true;
        }
        for (a, b) in out.iter_mut().zip(&self.other_buffer[..got]) {
            *a = (*a + b) * 0.5;
        }
        Ok(Some(r))
    }

    fn length(&self) -> Option<usize> {
        self.main.length()
    }

    fn box_clone(&self) -> StreamBox<Sample> {
        StreamBox::new(self.clone())
    }
}
