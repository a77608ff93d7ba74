//! Channel vocoder: imposes the spectral envelope of one track (the voice)
//! onto the harmonic content of another (the carrier).
//!
//! Each frame windows both inputs with `sin(pi i / N)^2`, takes their FFTs and
//! smooths the power spectra through a mel filter bank into envelopes. Every
//! carrier bin is rescaled by `voice_env / carrier_env`, the spectrum is made
//! Hermitian again and the inverse FFT is overlap-added by the
//! [`WindowStream`] driving the frames.

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use tracing::trace;

use super::mel::MelFilterBank;
use crate::error::Error;
use crate::settings::VocoderSettings;
use crate::stream::{FrameSource, Sample, Stream, WindowStream, Windower};

pub type Vocoder<A, B> = WindowStream<VocoderFrames<A, B>>;

/// Per-frame spectral work for a [`Vocoder`]. All buffers and FFT plans are
/// allocated up front; the window, filter bank and plans are shared between
/// clones.
#[derive(Clone)]
pub struct VocoderFrames<A, B> {
    voice: A,
    carrier: B,
    voice_window: Windower<Sample>,
    carrier_window: Windower<Sample>,
    hop: usize,
    frames: usize,

    window: Arc<[f32]>,
    bank: Arc<MelFilterBank>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,

    voice_spectrum: Vec<Complex<f32>>,
    carrier_spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    voice_envelope: Vec<f32>,
    carrier_envelope: Vec<f32>,
    band_energy: Vec<f32>,
}

impl<A: Stream<Sample>, B: Stream<Sample>> VocoderFrames<A, B> {
    /// Settings are expected to be validated already; a hop outside
    /// `1..=window_size` is clamped.
    pub fn new(voice: A, carrier: B, settings: &VocoderSettings) -> Self {
        let size = settings.window_size.max(2);
        let half = size / 2;

        let window: Arc<[f32]> = (0..size)
            .map(|i| {
                let p = (PI * i as f32 / size as f32).sin();
                p * p
            })
            .collect();
        let bank = MelFilterBank::new(half, 0.0, half as f32, size, settings.bands);

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        VocoderFrames {
            voice,
            carrier,
            voice_window: Windower::new(size),
            carrier_window: Windower::new(size),
            hop: settings.hop.clamp(1, size),
            frames: 0,
            window,
            bank: Arc::new(bank),
            forward,
            inverse,
            voice_spectrum: vec![Complex::new(0.0, 0.0); size],
            carrier_spectrum: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            voice_envelope: vec![0.0; half],
            carrier_envelope: vec![0.0; half],
            band_energy: vec![0.0; settings.bands],
        }
    }

    pub fn into_stream(self) -> Vocoder<A, B> {
        let (size, hop) = (self.window.len(), self.hop);
        WindowStream::new(self, size, hop)
    }
}

/// `sqrt` of the mel band energies of `spectrum`, spread back over the
/// lower half of the bins.
fn envelope(
    bank: &MelFilterBank,
    spectrum: &[Complex<f32>],
    band_energy: &mut [f32],
    out: &mut [f32],
) {
    for (o, bin) in out.iter_mut().zip(spectrum) {
        *o = bin.norm_sqr();
    }
    bank.apply(out, band_energy);
    for e in band_energy.iter_mut() {
        *e = e.sqrt();
    }
    bank.reconstruct(band_energy, out);
}

impl<A: Stream<Sample>, B: Stream<Sample>> FrameSource for VocoderFrames<A, B> {
    fn produce_frame(&mut self, output: &mut [Sample]) -> Result<bool, Error> {
        let hop = self.hop;
        let got_voice = self.voice_window.read_from(&mut self.voice, hop)?;
        let got_carrier = self.carrier_window.read_from(&mut self.carrier, hop)?;
        if got_voice < hop || got_carrier < hop {
            trace!(frames = self.frames, "vocoder input exhausted");
            return Ok(false);
        }

        let size = self.window.len();
        let half = size / 2;

        for (i, &w) in self.window.iter().enumerate() {
            self.voice_spectrum[i] = Complex::new(self.voice_window.buffer()[i] * w, 0.0);
            self.carrier_spectrum[i] = Complex::new(self.carrier_window.buffer()[i] * w, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.voice_spectrum, &mut self.scratch);
        self.forward
            .process_with_scratch(&mut self.carrier_spectrum, &mut self.scratch);

        envelope(
            &self.bank,
            &self.voice_spectrum,
            &mut self.band_energy,
            &mut self.voice_envelope,
        );
        envelope(
            &self.bank,
            &self.carrier_spectrum,
            &mut self.band_energy,
            &mut self.carrier_envelope,
        );

        for i in 0..half {
            let carrier = self.carrier_spectrum[i];
            let carrier_env = self.carrier_envelope[i];
            self.voice_spectrum[i] = if carrier_env == 0.0 {
                carrier
            } else {
                carrier * (self.voice_envelope[i] / carrier_env) * 2.0
            };
        }
        // the Nyquist bin keeps the voice's own value
        for i in half..size {
            self.voice_spectrum[i] = self.voice_spectrum[size - i].conj();
        }

        self.inverse
            .process_with_scratch(&mut self.voice_spectrum, &mut self.scratch);
        let scale = 1.0 / size as f32;
        for (o, bin) in output.iter_mut().zip(&self.voice_spectrum) {
            *o += bin.re * scale;
        }

        self.frames += 1;
        trace!(frame = self.frames, "vocoder frame");
        Ok(true)
    }

    fn length(&self) -> Option<usize> {
        self.voice.length()
    }
}

impl<A, B> fmt::Debug for VocoderFrames<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VocoderFrames")
            .field("window_size", &self.window.len())
            .field("hop", &self.hop)
            .field("bands", &self.bank.bands())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn sine(len: usize, freq: f32, amplitude: f32) -> Vec<Sample> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / 44_100.0).sin())
            .collect()
    }

    fn vocoder(voice: Vec<Sample>, carrier: Vec<Sample>) -> Vocoder<MemoryStream<Sample>, MemoryStream<Sample>> {
        VocoderFrames::new(
            MemoryStream::new(voice),
            MemoryStream::new(carrier),
            &VocoderSettings::default(),
        )
        .into_stream()
    }

    fn drain(s: &mut impl Stream<Sample>) -> Vec<Sample> {
        let mut out = Vec::new();
        let mut buf = vec![0.0; 1000];
        while let Some(n) = s.read(&mut buf).unwrap() {
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn identical_inputs_double_and_delay_by_hop() {
        let input = sine(16_384, 441.0, 1000.0);
        let mut v = vocoder(input.clone(), input.clone());
        assert_eq!(v.length(), Some(16_384));

        let out = drain(&mut v);
        // 16 frames of one hop each, then the drained overlap
        assert_eq!(out.len(), 17 * 1024);
        for i in 2048..14_000 {
            let expected = 2.0 * input[i];
            let got = out[i + 1024];
            assert!((got - expected).abs() < 1.0, "sample {i}: {got} vs {expected}");
        }
    }

    #[test]
    fn silent_carrier_leaves_only_the_voice_nyquist_bin() {
        let mut v = vocoder(sine(8192, 300.0, 500.0), vec![0.0; 8192]);
        let out = drain(&mut v);
        assert!(!out.is_empty());
        // only the Nyquist bin survives, and it comes from the voice
        assert!(out.iter().all(|&x| x.abs() < 0.01));
        assert!(out.iter().any(|&x| x != 0.0));

        // a lone Nyquist bin is a sign-alternating constant within each hop
        for i in 0..out.len() - 1 {
            if (i + 1) % 1024 == 0 {
                continue;
            }
            assert!((out[i] + out[i + 1]).abs() < 1e-5, "sample {i}: {} {}", out[i], out[i + 1]);
        }
    }

    #[test]
    fn shorter_track_ends_the_frames() {
        let mut v = vocoder(vec![1.0; 10_000], vec![1.0; 3000]);
        // two full hops from the carrier
        assert_eq!(drain(&mut v).len(), 2 * 1024 + 1024);
        assert_eq!(v.length(), Some(10_000));

        let mut tiny = vocoder(vec![1.0; 500], vec![1.0; 500]);
        assert!(drain(&mut tiny).is_empty());
    }

    #[test]
    fn clone_mid_stream_continues_identically() {
        let voice = sine(12_000, 220.0, 800.0);
        let carrier = sine(12_000, 660.0, 800.0);
        let mut a = vocoder(voice, carrier);
        let mut head = vec![0.0; 3000];
        a.read_full(&mut head).unwrap();
        let mut b = a.clone();
        assert_eq!(drain(&mut a), drain(&mut b));
    }
}
