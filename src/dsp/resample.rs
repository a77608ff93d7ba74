//! Speed change by an arbitrary positive factor.
//!
//! Output index `i` of a factor-`f` resample maps to input position `i / f`.
//! Span boundaries are recomputed in `f64` from absolute indices, so long
//! streams don't drift.

use crate::error::{ConfigError, Error};
use crate::stream::{BufferedStream, Sample, Stream, StreamBox};

/// `f > 1` repeats samples, `f <= 1` averages spans.
#[derive(Debug, Clone)]
pub enum Resample<S> {
    Up(Upsample<S>),
    Down(Downsample<S>),
}

impl<S: Stream<Sample>> Resample<S> {
    pub fn new(inner: S, factor: f64, chunk_size: usize) -> Result<Self, ConfigError> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(ConfigError::ZeroFactor);
        }
        let inner = BufferedStream::new(inner, chunk_size);
        Ok(if factor > 1.0 {
            Resample::Up(Upsample {
                inner,
                factor,
                consumed: 0,
                current: 0.0,
                repeat: 0,
                ended: false,
            })
        } else {
            Resample::Down(Downsample {
                inner,
                factor,
                produced: 0,
                ended: false,
            })
        })
    }
}

impl<S: Stream<Sample> + Clone + 'static> Stream<Sample> for Resample<S> {
    fn read(&mut self, out: &mut [Sample]) -> Result<Option<usize>, Error> {
        match self {
            Resample::Up(s) => fill(out, || s.next()),
            Resample::Down(s) => fill(out, || s.next()),
        }
    }

    fn length(&self) -> Option<usize> {
        match self {
            Resample::Up(s) => s.inner.length().map(|n| (n as f64 * s.factor).floor() as usize),
            Resample::Down(s) => s.inner.length().map(|n| downsampled_len(n, s.factor)),
        }
    }

    fn box_clone(&self) -> StreamBox<Sample> {
        StreamBox::new(self.clone())
    }
}

/// Fill `out` one sample at a time until `next` runs out. `next` keeps
/// returning `None` once it has.
fn fill(
    out: &mut [Sample],
    mut next: impl FnMut() -> Result<Option<Sample>, Error>,
) -> Result<Option<usize>, Error> {
    for (i, slot) in out.iter_mut().enumerate() {
        match next()? {
            Some(x) => *slot = x,
            None => return Ok((i > 0).then_some(i)),
        }
    }
    Ok(Some(out.len()))
}

/// Largest `m` with `floor(m / f) <= n`: the number of complete spans.
fn downsampled_len(n: usize, factor: f64) -> usize {
    let end = |m: usize| (m as f64 / factor).floor() as usize;
    let mut m = (n as f64 * factor).floor() as usize;
    while m > 0 && end(m) > n {
        m -= 1;
    }
    while end(m + 1) <= n {
        m += 1;
    }
    m
}

/// Input sample `j` is emitted `floor((j + 1) f) - floor(j f)` times.
#[derive(Debug, Clone)]
pub struct Upsample<S> {
    inner: BufferedStream<Sample, S>,
    factor: f64,
    consumed: usize,
    current: Sample,
    repeat: usize,
    ended: bool,
}

impl<S: Stream<Sample> + Clone + 'static> Upsample<S> {
    fn next(&mut self) -> Result<Option<Sample>, Error> {
        if self.ended {
            return Ok(None);
        }
        while self.repeat == 0 {
            let Some(x) = self.inner.read_single()? else {
                self.ended = true;
                return Ok(None);
            };
            let j = self.consumed as f64;
            self.repeat = ((j + 1.0) * self.factor).floor() as usize
                - (j * self.factor).floor() as usize;
            self.consumed += 1;
            self.current = x;
        }
        self.repeat -= 1;
        Ok(Some(self.current))
    }
}

/// Output `i` is the mean of input span `[floor(i / f), floor((i + 1) / f))`.
/// A span cut short by the end of the input is dropped.
#[derive(Debug, Clone)]
pub struct Downsample<S> {
    inner: BufferedStream<Sample, S>,
    factor: f64,
    produced: usize,
    ended: bool,
}

impl<S: Stream<Sample> + Clone + 'static> Downsample<S> {
    fn next(&mut self) -> Result<Option<Sample>, Error> {
        if self.ended {
            return Ok(None);
        }
        let i = self.produced as f64;
        let start = (i / self.factor).floor() as usize;
        let end = ((i + 1.0) / self.factor).floor() as usize;
        let len = end - start;

        let mut sum = 0.0;
        for _ in 0..len {
            let Some(x) = self.inner.read_single()? else {
                self.ended = true;
                return Ok(None);
            };
            sum += x;
        }
        self.produced += 1;
        Ok(Some(sum / len.max(1) as Sample))
    }
}
