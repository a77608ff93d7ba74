//! WAV (RIFF) decoding for the one profile the pipeline speaks: mono,
//! 16-bit signed PCM at 44.1 kHz.

use tracing::{debug, warn};

use super::traits::{Sample, Stream, StreamBox};
use crate::error::Error;

/// The only sample rate supported on input and produced on output.
pub const SAMPLE_RATE: u32 = 44_100;

/// Size of the RIFF header plus a plain 16-byte `fmt ` chunk.
pub const HEADER_LEN: usize = 36;

/// Size of the header the renderer writes (`HEADER_LEN` plus the `data`
/// chunk header).
pub const OUTPUT_HEADER_LEN: usize = HEADER_LEN + 8;

const PCM_FORMAT: u16 = 1;

/// Fields of the RIFF header and `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub chunk_size: u32,
    pub fmt_size: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl WavHeader {
    /// The supported profile with a zero `chunk_size`.
    pub fn mono_pcm16() -> Self {
        WavHeader {
            chunk_size: 0,
            fmt_size: 16,
            audio_format: PCM_FORMAT,
            channels: 1,
            sample_rate: SAMPLE_RATE,
            byte_rate: SAMPLE_RATE * 2,
            block_align: 2,
            bits_per_sample: 16,
        }
    }

    /// Decode the first [`HEADER_LEN`] bytes of a file. Fails with
    /// `UnsupportedFormat` when the RIFF/WAVE/fmt identifiers don't match.
    pub fn parse(raw: &[u8; HEADER_LEN]) -> Result<Self, Error> {
        let u16_at = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);

        for (at, id) in [(0, b"RIFF"), (8, b"WAVE"), (12, b"fmt ")] {
            if &raw[at..at + 4] != id {
                return Err(Error::UnsupportedFormat(format!(
                    "expected \"{}\" at byte {at}, found {:?}",
                    String::from_utf8_lossy(id),
                    String::from_utf8_lossy(&raw[at..at + 4]),
                )));
            }
        }

        Ok(WavHeader {
            chunk_size: u32_at(4),
            fmt_size: u32_at(16),
            audio_format: u16_at(20),
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
        })
    }

    /// Check every profile field against [`WavHeader::mono_pcm16`].
    pub fn check_profile(&self) -> Result<(), Error> {
        let want = Self::mono_pcm16();
        let mismatch = if self.audio_format != want.audio_format {
            Some(format!("audio format {} (only PCM is supported)", self.audio_format))
        } else if self.channels != want.channels {
            Some(format!("{} channels (only mono is supported)", self.channels))
        } else if self.sample_rate != want.sample_rate {
            Some(format!("sample rate {} Hz (only {SAMPLE_RATE} Hz is supported)", self.sample_rate))
        } else if self.bits_per_sample != want.bits_per_sample {
            Some(format!("{} bits per sample (only 16 is supported)", self.bits_per_sample))
        } else if self.byte_rate != want.byte_rate || self.block_align != want.block_align {
            Some(format!(
                "byte rate {} / block align {} do not match mono 16-bit PCM",
                self.byte_rate, self.block_align
            ))
        } else if self.fmt_size < want.fmt_size {
            Some(format!("fmt chunk of {} bytes", self.fmt_size))
        } else {
            None
        };

        match mismatch {
            Some(reason) => Err(Error::UnsupportedFormat(reason)),
            None => Ok(()),
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(b"RIFF");
        buf[4..8].copy_from_slice(&self.chunk_size.to_le_bytes());
        buf[8..12].copy_from_slice(b"WAVE");
        buf[12..16].copy_from_slice(b"fmt ");
        buf[16..20].copy_from_slice(&self.fmt_size.to_le_bytes());
        buf[20..22].copy_from_slice(&self.audio_format.to_le_bytes());
        buf[22..24].copy_from_slice(&self.channels.to_le_bytes());
        buf[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        buf[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        buf[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        buf[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        buf
    }
}

/// The header the renderer emits. Both size fields are left at zero; the
/// output is streamed and never back-patched.
pub fn output_header() -> [u8; OUTPUT_HEADER_LEN] {
    let mut buf = [0u8; OUTPUT_HEADER_LEN];
    buf[..HEADER_LEN].copy_from_slice(&WavHeader::mono_pcm16().to_bytes());
    buf[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(b"data");
    buf
}

/// Decodes a WAV byte stream into samples.
///
/// The header is validated on the first read, or eagerly through
/// [`WavStream::prepare`]. Samples are widened from `i16` without scaling.
/// A `data` chunk cut short of its declared size is not an error: the
/// stream ends early while `length()` keeps reporting the declared count.
#[derive(Debug, Clone)]
pub struct WavStream<S> {
    inner: S,
    ready: bool,
    len: Option<usize>,
    /// Bytes of the `data` chunk not read yet.
    remaining: usize,
    ended: bool,
    scratch: Vec<u8>,
}

impl<S: Stream<u8>> WavStream<S> {
    pub fn new(inner: S) -> Self {
        WavStream {
            inner,
            ready: false,
            len: None,
            remaining: 0,
            ended: false,
            scratch: vec![0; SAMPLE_RATE as usize * 2],
        }
    }

    /// Read and validate the header, then position the stream at the start
    /// of the `data` chunk. Does nothing once it has succeeded.
    pub fn prepare(&mut self) -> Result<(), Error> {
        if self.ready {
            return Ok(());
        }

        let mut raw = [0u8; HEADER_LEN];
        if self.inner.read_full(&mut raw)? < HEADER_LEN {
            return Err(Error::MalformedWav("truncated header".into()));
        }
        let header = WavHeader::parse(&raw)?;
        header.check_profile()?;
        debug!(?header, "decoded WAV header");

        let extension = (header.fmt_size - 16) as usize;
        if extension > 0 && self.inner.skip(extension)? < extension {
            return Err(Error::MalformedWav("truncated fmt chunk".into()));
        }

        loop {
            let mut chunk = [0u8; 8];
            if self.inner.read_full(&mut chunk)? < chunk.len() {
                return Err(Error::MalformedWav("truncated chunk header".into()));
            }
            let id = String::from_utf8_lossy(&chunk[..4]).into_owned();
            let size = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]) as usize;

            if id == "data" {
                if size % 2 == 1 {
                    return Err(Error::MalformedWav(format!("odd data chunk size {size}")));
                }
                debug!(samples = size / 2, "found data chunk");
                self.len = Some(size / 2);
                self.remaining = size;
                break;
            }

            debug!(chunk = %id, size, "skipping chunk");
            if self.inner.skip(size)? < size {
                return Err(Error::MalformedWav(format!("truncated \"{id}\" chunk")));
            }
        }

        self.ready = true;
        Ok(())
    }
}

impl<S: Stream<u8> + Clone + 'static> Stream<Sample> for WavStream<S> {
    fn read(&mut self, out: &mut [Sample]) -> Result<Option<usize>, Error> {
        self.prepare()?;
        if self.ended {
            return Ok(None);
        }
        if self.remaining == 0 {
            self.ended = true;
            return Ok(None);
        }

        let want = (out.len() * 2).min(self.scratch.len()).min(self.remaining);
        let r = self.inner.read_full(&mut self.scratch[..want])?;
        self.remaining -= r;

        let n = r / 2;
        for (o, pair) in out.iter_mut().zip(self.scratch[..n * 2].chunks_exact(2)) {
            *o = i16::from_le_bytes([pair[0], pair[1]]) as Sample;
        }

        if r < want {
            warn!(missing_bytes = self.remaining, "WAV data ends before its declared size");
            self.ended = true;
            if n == 0 {
                return Ok(None);
            }
        }
        Ok(Some(n))
    }

    /// Known once the header has been read.
    fn length(&self) -> Option<usize> {
        self.len
    }

    fn box_clone(&self) -> StreamBox<Sample> {
        StreamBox::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;
    use std::io::Cursor;

    fn hound_wav(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        bytes
    }

    fn mono16() -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Hand-built file: optional fmt extension, extra chunks, then data.
    fn raw_wav(fmt_extra: &[u8], chunks: &[(&[u8; 4], &[u8])], data: &[u8]) -> Vec<u8> {
        let mut header = WavHeader::mono_pcm16();
        header.fmt_size = 16 + fmt_extra.len() as u32;
        let mut out = header.to_bytes().to_vec();
        out.extend_from_slice(fmt_extra);
        for (id, body) in chunks {
            out.extend_from_slice(*id);
            out.extend_from_slice(&(body.len() as u32).to_le_bytes());
            out.extend_from_slice(body);
        }
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    fn decode(bytes: Vec<u8>) -> WavStream<MemoryStream<u8>> {
        WavStream::new(MemoryStream::new(bytes))
    }

    fn drain(s: &mut impl Stream<Sample>) -> Result<Vec<Sample>, Error> {
        let mut out = Vec::new();
        let mut buf = [0.0; 100];
        while let Some(n) = s.read(&mut buf)? {
            out.extend_from_slice(&buf[..n]);
        }
        Ok(out)
    }

    #[test]
    fn decodes_pcm_without_scaling() {
        let samples: Vec<i16> = vec![0, 1, -1, 1234, i16::MAX, i16::MIN];
        let mut s = decode(hound_wav(mono16(), &samples));
        assert_eq!(s.length(), None);
        s.prepare().unwrap();
        assert_eq!(s.length(), Some(samples.len()));
        let expected: Vec<Sample> = samples.iter().map(|&x| x as Sample).collect();
        assert_eq!(drain(&mut s).unwrap(), expected);
    }

    #[test]
    fn long_file_across_scratch_chunks() {
        let samples: Vec<i16> = (0..100_000).map(|i| (i % 3000) as i16 - 1500).collect();
        let mut s = decode(hound_wav(mono16(), &samples));
        let mut out = vec![0.0; 150_000];
        assert_eq!(s.read_full(&mut out).unwrap(), samples.len());
        assert_eq!(out[99_999], samples[99_999] as Sample);
    }

    #[test]
    fn skips_chunks_and_fmt_extension() {
        let data = [1u8, 0, 2, 0, 3, 0];
        let bytes = raw_wav(&[0, 0], &[(b"LIST", &b"INFOxxxx"[..]), (b"fact", &[4u8, 0, 0, 0][..])], &data);
        let mut s = decode(bytes);
        assert_eq!(drain(&mut s).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn stops_at_end_of_data_chunk() {
        let mut bytes = raw_wav(&[], &[], &[5, 0, 6, 0]);
        bytes.extend_from_slice(b"LIST\x04\x00\x00\x00junk");
        let mut s = decode(bytes);
        assert_eq!(drain(&mut s).unwrap(), vec![5.0, 6.0]);
    }

    #[test]
    fn truncated_data_ends_early() {
        let mut bytes = raw_wav(&[], &[], &[7, 0, 8, 0, 9, 0]);
        bytes.truncate(bytes.len() - 2);
        let mut s = decode(bytes);
        assert_eq!(drain(&mut s).unwrap(), vec![7.0, 8.0]);
        assert_eq!(s.length(), Some(3));
    }

    #[test]
    fn rejects_other_profiles() {
        let stereo = hound::WavSpec { channels: 2, ..mono16() };
        let err = decode(hound_wav(stereo, &[0, 0])).prepare().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)), "{err}");

        let fast = hound::WavSpec { sample_rate: 48_000, ..mono16() };
        let err = decode(hound_wav(fast, &[0])).prepare().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)), "{err}");

        let mut bytes = raw_wav(&[], &[], &[]);
        bytes[8..12].copy_from_slice(b"AVI ");
        let err = decode(bytes).prepare().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)), "{err}");
    }

    #[test]
    fn rejects_malformed_files() {
        let err = decode(b"RIFF\0\0\0\0WAVE".to_vec()).prepare().unwrap_err();
        assert!(matches!(err, Error::MalformedWav(_)), "{err}");

        let err = decode(raw_wav(&[], &[], &[1, 0, 2])).prepare().unwrap_err();
        assert!(matches!(err, Error::MalformedWav(_)), "{err}");

        // a chunk that claims more bytes than the file holds
        let mut bytes = WavHeader::mono_pcm16().to_bytes().to_vec();
        bytes.extend_from_slice(b"LIST\xff\x00\x00\x00abc");
        let err = decode(bytes).prepare().unwrap_err();
        assert!(matches!(err, Error::MalformedWav(_)), "{err}");

        // header only, no data chunk
        let err = decode(WavHeader::mono_pcm16().to_bytes().to_vec())
            .prepare()
            .unwrap_err();
        assert!(matches!(err, Error::MalformedWav(_)), "{err}");
    }

    #[test]
    fn output_header_layout() {
        let header = output_header();
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[4..8], &[0; 4]);
        assert_eq!(&header[36..40], b"data");
        assert_eq!(&header[40..44], &[0; 4]);
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&header[..HEADER_LEN]);
        let parsed = WavHeader::parse(&raw).unwrap();
        assert_eq!(parsed, WavHeader::mono_pcm16());
        parsed.check_profile().unwrap();
    }

    #[test]
    fn clone_after_prepare_keeps_position() {
        let samples: Vec<i16> = (0..10).collect();
        let mut s = decode(hound_wav(mono16(), &samples));
        let mut head = [0.0; 4];
        s.read_full(&mut head).unwrap();
        let mut c = s.clone();
        assert_eq!(drain(&mut c).unwrap(), drain(&mut s).unwrap());
        assert_eq!(c.length(), Some(10));
    }
}
