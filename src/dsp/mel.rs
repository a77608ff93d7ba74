//! Triangular mel-scale filter bank, used to smooth power spectra into
//! spectral envelopes.

/// Dense `bands x spectrum_length` matrix of triangular filters. Immutable
/// once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MelFilterBank {
    spectrum_length: usize,
    bands: usize,
    matrix: Vec<f32>,
}

pub fn freq_to_mel(f: f32) -> f32 {
    (1125.0 * (1.0 + f as f64 / 700.0).ln()) as f32
}

pub fn mel_to_freq(m: f32) -> f32 {
    (700.0 * ((m as f64 / 1125.0).exp() - 1.0)) as f32
}

impl MelFilterBank {
    /// Band `b` spans mel `[b, b + 2] * step + min_mel` where
    /// `step = (max_mel - min_mel) / (bands - 1)`. Frequencies map to bins by
    /// `(spectrum_length + 1) * f / sample_rate`; anything past the last bin
    /// is cut off.
    pub fn new(
        spectrum_length: usize,
        min_freq: f32,
        max_freq: f32,
        sample_rate: usize,
        bands: usize,
    ) -> Self {
        let mut matrix = vec![0.0; bands * spectrum_length];
        let min_mel = freq_to_mel(min_freq);
        let max_mel = freq_to_mel(max_freq);
        let step = (max_mel - min_mel) / (bands.max(2) - 1) as f32;
        let to_bin =
            |f: f32| ((spectrum_length + 1) as f32 * f / sample_rate.max(1) as f32) as usize;

        if spectrum_length > 0 {
            for (band, row) in matrix.chunks_exact_mut(spectrum_length).enumerate() {
                let start = to_bin(mel_to_freq(band as f32 * step + min_mel));
                let end = to_bin(mel_to_freq((band + 2) as f32 * step + min_mel));
                triangle(row, start, end);
            }
        }

        MelFilterBank {
            spectrum_length,
            bands,
            matrix,
        }
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn spectrum_length(&self) -> usize {
        self.spectrum_length
    }

    /// Filter weights of one band.
    pub fn row(&self, band: usize) -> &[f32] {
        &self.matrix[band * self.spectrum_length..(band + 1) * self.spectrum_length]
    }

    /// `output[b] = sum_j M[b][j] * input[j]`
    pub fn apply(&self, input: &[f32], output: &mut [f32]) {
        for (band, out) in output.iter_mut().enumerate().take(self.bands) {
            *out = self.row(band).iter().zip(input).map(|(w, x)| w * x).sum();
        }
    }

    /// Transposed product: `output[j] = sum_b M[b][j] * input[b]`
    pub fn reconstruct(&self, input: &[f32], output: &mut [f32]) {
        let len = self.spectrum_length.min(output.len());
        output[..len].fill(0.0);
        for (band, &x) in input.iter().enumerate().take(self.bands) {
            for (out, w) in output[..len].iter_mut().zip(self.row(band)) {
                *out += w * x;
            }
        }
    }
}

/// Fill `row[start..end]` with a triangle rising from 0 to 1 and back,
/// dropping whatever falls past the end of the row.
fn triangle(row: &mut [f32], start: usize, end: usize) {
    if end <= start {
        return;
    }
    let n = end - start;
    let norm = if n % 2 == 0 {
        (n as f32 - 2.0) / 2.0
    } else {
        (n as f32 - 1.0) / 2.0
    };

    for i in 0..n {
        let Some(cell) = row.get_mut(start + i) else {
            break;
        };
        if norm <= 0.0 {
            *cell = 0.0;
        } else if i < n / 2 {
            *cell = i as f32 / norm;
        } else {
            *cell = (n - i - 1) as f32 / norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_scale_round_trips() {
        assert_eq!(freq_to_mel(0.0), 0.0);
        for f in [10.0, 440.0, 1000.0, 8000.0] {
            let back = mel_to_freq(freq_to_mel(f));
            assert!((back - f).abs() < f * 1e-4, "{f} -> {back}");
        }
        // 1000 Hz sits near 1000 mel on this curve
        assert!((freq_to_mel(1000.0) - 998.2).abs() < 1.0);
    }

    #[test]
    fn triangle_shapes() {
        let mut odd = [9.0; 7];
        triangle(&mut odd, 1, 6);
        assert_eq!(odd, [9.0, 0.0, 0.5, 1.0, 0.5, 0.0, 9.0]);

        let mut even = [0.0; 4];
        triangle(&mut even, 0, 4);
        assert_eq!(even, [0.0, 1.0, 1.0, 0.0]);

        // clipped at the end of the row
        let mut short = [0.0; 3];
        triangle(&mut short, 1, 6);
        assert_eq!(short, [0.0, 0.0, 0.5]);

        // too narrow to carry any weight
        let mut tiny = [5.0; 3];
        triangle(&mut tiny, 0, 2);
        assert_eq!(tiny, [0.0, 0.0, 5.0]);
    }

    #[test]
    fn bands_cover_the_spectrum_in_order() {
        let bank = MelFilterBank::new(1024, 0.0, 1024.0, 2048, 40);
        assert_eq!(bank.bands(), 40);
        let peak = |b: usize| {
            bank.row(b)
                .iter()
                .enumerate()
                .fold((0, 0.0f32), |best, (i, &w)| if w > best.1 { (i, w) } else { best })
                .0
        };
        for b in 1..40 {
            assert!(peak(b) >= peak(b - 1), "band {b}");
        }
        assert!(bank.row(0).iter().all(|&w| (0.0..=1.0).contains(&w)));
    }

    #[test]
    fn reconstruct_is_the_transpose() {
        let bank = MelFilterBank::new(64, 0.0, 64.0, 128, 8);
        let x: Vec<f32> = (0..64).map(|i| (i % 7) as f32).collect();
        let y: Vec<f32> = (0..8).map(|i| i as f32 + 1.0).collect();

        let mut mx = vec![0.0; 8];
        bank.apply(&x, &mut mx);
        let mut mty = vec![0.0; 64];
        bank.reconstruct(&y, &mut mty);

        let lhs: f32 = mx.iter().zip(&y).map(|(a, b)| a * b).sum();
        let rhs: f32 = x.iter().zip(&mty).map(|(a, b)| a * b).sum();
        assert!((lhs - rhs).abs() < 1e-3 * lhs.abs().max(1.0), "{lhs} vs {rhs}");
    }
}
