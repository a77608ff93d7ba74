//! The `Stream` trait and its owning, clone-able container.

use std::fmt;

use crate::error::Error;

/// A single audio sample. PCM is widened to `f32` without normalisation.
pub type Sample = f32;

/// Element types a stream can carry (`u8` for bytes, [`Sample`] for audio).
pub trait Element: Copy + Default + 'static {}

impl<T: Copy + Default + 'static> Element for T {}

/// A pull source of `T`.
///
/// `read` may return fewer elements than requested, including `Some(0)`
/// transiently; `None` means the stream has ended and will stay ended.
/// Callers that need a full buffer use [`read_full`](Stream::read_full).
pub trait Stream<T: Element> {
    /// Read up to `buf.len()` elements into `buf`.
    fn read(&mut self, buf: &mut [T]) -> Result<Option<usize>, Error>;

    /// Keep reading until `buf` is full or the stream ends. Returns the number
    /// of elements written, which is only short of `buf.len()` at the end.
    fn read_full(&mut self, buf: &mut [T]) -> Result<usize, Error> {
        let mut off = 0;
        while off < buf.len() {
            match self.read(&mut buf[off..])? {
                Some(n) => off += n,
                None => break,
            }
        }
        Ok(off)
    }

    fn read_single(&mut self) -> Result<Option<T>, Error> {
        let mut one = [T::default()];
        loop {
            match self.read(&mut one)? {
                Some(1) => return Ok(Some(one[0])),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Discard up to `n` elements. Returns how many were actually skipped.
    fn skip(&mut self, n: usize) -> Result<usize, Error> {
        let mut scratch = [T::default(); 64];
        let mut off = 0;
        while off < n {
            let want = scratch.len().min(n - off);
            match self.read(&mut scratch[..want])? {
                Some(r) => off += r,
                None => break,
            }
        }
        Ok(off)
    }

    /// Total number of elements this stream yields from its start, if it can
    /// be known exactly.
    fn length(&self) -> Option<usize> {
        None
    }

    /// An independent copy positioned where `self` currently is.
    fn box_clone(&self) -> StreamBox<T>;
}

/// Owning handle to any stream. Cloning a `StreamBox` deep-clones the stream
/// it holds via [`Stream::box_clone`].
pub struct StreamBox<T: Element>(Box<dyn Stream<T>>);

impl<T: Element> StreamBox<T> {
    pub fn new<S: Stream<T> + 'static>(stream: S) -> Self {
        StreamBox(Box::new(stream))
    }
}

impl<T: Element> Clone for StreamBox<T> {
    fn clone(&self) -> Self {
        self.0.box_clone()
    }
}

impl<T: Element> fmt::Debug for StreamBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBox")
            .field("length", &self.0.length())
            .finish_non_exhaustive()
    }
}

impl<T: Element> Stream<T> for StreamBox<T> {
    fn read(&mut self, buf: &mut [T]) -> Result<Option<usize>, Error> {
        self.0.read(buf)
    }

    fn read_full(&mut self, buf: &mut [T]) -> Result<usize, Error> {
        self.0.read_full(buf)
    }

    fn read_single(&mut self) -> Result<Option<T>, Error> {
        self.0.read_single()
    }

    fn skip(&mut self, n: usize) -> Result<usize, Error> {
        self.0.skip(n)
    }

    fn length(&self) -> Option<usize> {
        self.0.length()
    }

    fn box_clone(&self) -> StreamBox<T> {
        self.0.box_clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    /// Hands out at most `step` elements per read and a `Some(0)` every other
    /// call, like a slow file.
    #[derive(Clone)]
    struct Trickle {
        inner: MemoryStream<Sample>,
        step: usize,
        stall: bool,
        ended: bool,
    }

    impl Stream<Sample> for Trickle {
        fn read(&mut self, buf: &mut [Sample]) -> Result<Option<usize>, Error> {
            if self.ended {
                return Ok(None);
            }
            self.stall = !self.stall;
            if self.stall {
                return Ok(Some(0));
            }
            let n = buf.len().min(self.step);
            let r = self.inner.read(&mut buf[..n])?;
            self.ended = r.is_none();
            Ok(r)
        }

        fn length(&self) -> Option<usize> {
            self.inner.length()
        }

        fn box_clone(&self) -> StreamBox<Sample> {
            StreamBox::new(self.clone())
        }
    }

    fn ramp(len: usize) -> Vec<Sample> {
        (0..len).map(|i| i as Sample).collect()
    }

    fn trickle(len: usize, step: usize) -> Trickle {
        Trickle {
            inner: MemoryStream::new(ramp(len)),
            step,
            stall: false,
            ended: false,
        }
    }

    #[test]
    fn read_full_survives_short_reads() {
        for len in [0, 1, 7, 100, 1000] {
            let mut s = trickle(len, 3);
            let mut total = Vec::new();
            let mut buf = [0.0; 64];
            loop {
                let n = s.read_full(&mut buf).unwrap();
                total.extend_from_slice(&buf[..n]);
                if n < buf.len() {
                    break;
                }
            }
            assert_eq!(total, ramp(len), "len {len}");
            assert_eq!(s.read(&mut buf).unwrap(), None);
        }
    }

    #[test]
    fn read_single_and_skip() {
        let mut s = trickle(10, 4);
        assert_eq!(s.read_single().unwrap(), Some(0.0));
        assert_eq!(s.skip(5).unwrap(), 5);
        assert_eq!(s.read_single().unwrap(), Some(6.0));
        assert_eq!(s.skip(100).unwrap(), 3);
        assert_eq!(s.read_single().unwrap(), None);
    }

    #[test]
    fn box_clone_is_independent() {
        let mut a = StreamBox::new(trickle(8, 8));
        a.skip(3).unwrap();
        let mut b = a.clone();
        assert_eq!(a.length(), Some(8));

        let mut buf = [0.0; 8];
        assert_eq!(a.read_full(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], &[3.0, 4.0, 5.0, 6.0, 7.0]);

        // the clone still starts where `a` was when it was cloned
        assert_eq!(b.read_full(&mut buf).unwrap(), 5);
        assert_eq!(buf[0], 3.0);
    }
}
