//! Welch power spectral density estimation.
//!
//! The estimate splits the input into half-overlapping sub-segments, removes
//! each sub-segment's mean, applies a periodic Hann window and averages the
//! one-sided periodograms, scaled as a density (units²/Hz).

use crate::config::BandDefinition;
use rustfft::{num_complex::Complex, FftPlanner};

/// One-sided power spectral density on a uniform frequency grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Frequency of each bin in Hz, starting at 0
    pub frequencies: Vec<f64>,
    /// Power density per bin
    pub density: Vec<f64>,
    /// Spacing between bins in Hz
    pub resolution_hz: f64,
}

impl Psd {
    /// Number of frequency bins.
    pub fn bins(&self) -> usize {
        self.density.len()
    }

    /// Rectangle-rule power of the bins that fall inside `band`.
    pub fn band_power(&self, band: &BandDefinition) -> f64 {
        let sum: f64 = self
            .frequencies
            .iter()
            .zip(&self.density)
            .filter(|&(&f, _)| band.contains(f))
            .map(|(_, &p)| p)
            .sum();
        sum * self.resolution_hz
    }

    /// Rectangle-rule power of the whole spectrum.
    pub fn total_power(&self) -> f64 {
        self.density.iter().sum::<f64>() * self.resolution_hz
    }
}

/// Welch estimator for a fixed sampling rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchEstimator {
    sampling_rate: f64,
    max_segment_length: usize,
}

impl WelchEstimator {
    /// Create an estimator. Sub-segments are `min(input_len, max_segment_length)` long.
    pub fn new(sampling_rate: f64, max_segment_length: usize) -> Self {
        Self {
            sampling_rate,
            max_segment_length: max_segment_length.max(1),
        }
    }

    /// Sub-segment length used for an input of `n` samples.
    pub fn segment_length(&self, n: usize) -> usize {
        n.min(self.max_segment_length).max(1)
    }

    /// Estimate the PSD of `samples`.
    pub fn estimate(&self, samples: &[f64]) -> Psd {
        let nperseg = self.segment_length(samples.len());
        let n_bins = nperseg / 2 + 1;
        let resolution_hz = self.sampling_rate / nperseg as f64;
        let frequencies: Vec<f64> = (0..n_bins).map(|k| k as f64 * resolution_hz).collect();

        if samples.len() < nperseg {
            return Psd {
                frequencies,
                density: vec![0.0; n_bins],
                resolution_hz,
            };
        }

        let overlap = nperseg / 2;
        let step = nperseg - overlap;
        let n_segments = (samples.len() - nperseg) / step + 1;

        let window = hann_window(nperseg);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (self.sampling_rate * window_power);

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nperseg);
        let mut buffer = vec![Complex::new(0.0, 0.0); nperseg];
        let mut scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let mut accum = vec![0.0f64; n_bins];

        for seg in 0..n_segments {
            let start = seg * step;
            let segment = &samples[start..start + nperseg];
            let mean = segment.iter().sum::<f64>() / nperseg as f64;

            for (slot, (&x, &w)) in buffer.iter_mut().zip(segment.iter().zip(&window)) {
                *slot = Complex::new((x - mean) * w, 0.0);
            }
            fft.process_with_scratch(&mut buffer, &mut scratch);

            for (acc, c) in accum.iter_mut().zip(&buffer[..n_bins]) {
                *acc += c.norm_sqr();
            }
        }

        let mut density: Vec<f64> = accum
            .iter()
            .map(|&p| p * scale / n_segments as f64)
            .collect();

        // Fold negative frequencies in; DC and an even-length Nyquist bin are unique.
        let doubled_end = if nperseg % 2 == 0 { n_bins - 1 } else { n_bins };
        for p in density.iter_mut().take(doubled_end).skip(1) {
            *p *= 2.0;
        }

        Psd {
            frequencies,
            density,
            resolution_hz,
        }
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_frequency_grid() {
        let psd = WelchEstimator::new(128.0, 128).estimate(&vec![0.0; 256]);
        assert_eq!(psd.bins(), 65);
        assert_eq!(psd.frequencies[0], 0.0);
        assert!((psd.resolution_hz - 1.0).abs() < 1e-12);
        assert!((psd.frequencies[64] - 64.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_length_clamps_to_input() {
        let estimator = WelchEstimator::new(173.61, 128);
        assert_eq!(estimator.segment_length(173), 128);
        assert_eq!(estimator.segment_length(64), 64);
        assert_eq!(estimator.estimate(&vec![1.0; 173]).bins(), 65);
    }

    #[test]
    fn test_sine_peak_location() {
        let psd = WelchEstimator::new(128.0, 128).estimate(&sine(10.0, 128.0, 512));
        let peak = psd
            .density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((psd.frequencies[peak] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_parseval_for_white_like_signal() {
        // A density-scaled PSD integrates to the signal variance.
        let signal: Vec<f64> = (0..1024)
            .map(|i| ((i * 7919 % 101) as f64 - 50.0) / 50.0)
            .collect();
        let mean = signal.iter().sum::<f64>() / signal.len() as f64;
        let variance = signal.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / signal.len() as f64;

        let psd = WelchEstimator::new(100.0, 128).estimate(&signal);
        let ratio = psd.total_power() / variance;
        assert!(ratio > 0.7 && ratio < 1.3, "ratio {ratio}");
    }

    #[test]
    fn test_constant_signal_has_no_power() {
        let psd = WelchEstimator::new(173.61, 128).estimate(&vec![3.5; 173]);
        assert!(psd.density.iter().all(|&p| p.abs() < 1e-20));
    }

    #[test]
    fn test_single_sample() {
        let psd = WelchEstimator::new(173.61, 128).estimate(&[2.0]);
        assert_eq!(psd.bins(), 1);
        assert_eq!(psd.density, vec![0.0]);
    }

    #[test]
    fn test_band_power_inclusive_edges() {
        let psd = Psd {
            frequencies: vec![0.0, 1.0, 2.0, 3.0],
            density: vec![1.0, 2.0, 4.0, 8.0],
            resolution_hz: 0.5,
        };
        assert_eq!(psd.band_power(&BandDefinition::new("mid", 1.0, 2.0)), 3.0);
        assert_eq!(psd.total_power(), 7.5);
    }

    fn assert_density(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "density {actual:?}, expected {expected:?}");
        }
    }

    #[test]
    fn test_density_even_segment_keeps_nyquist_single() {
        // Hann [0, .5, 1, .5], |X|^2 = [0, 1, 4], scale 1/(fs * sum w^2) = 1/6.
        let psd = WelchEstimator::new(4.0, 4).estimate(&[1.0, -1.0, 1.0, -1.0]);
        assert_density(&psd.density, &[0.0, 1.0 / 3.0, 2.0 / 3.0]);
        assert_eq!(psd.frequencies, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_density_odd_segment_doubles_last_bin() {
        // Detrended [2/3, -1/3, -1/3], Hann [0, .75, .75], |X|^2 = [1/4, 1/16],
        // scale 1/(3 * 9/8) = 8/27; only the last bin is doubled.
        let psd = WelchEstimator::new(3.0, 3).estimate(&[1.0, 0.0, 0.0]);
        assert_density(&psd.density, &[2.0 / 27.0, 1.0 / 27.0]);
    }

    #[test]
    fn test_density_removes_segment_mean() {
        let offset = WelchEstimator::new(4.0, 4).estimate(&[3.0, 1.0, 3.0, 1.0]);
        assert_density(&offset.density, &[0.0, 1.0 / 3.0, 2.0 / 3.0]);
    }

    #[test]
    fn test_density_averages_overlapping_segments() {
        // Step 2: sub-segments [1, -1, 1, -1] and [1, -1, 0, 0].
        // The second has |X|^2 = 1/4 in every bin.
        let psd = WelchEstimator::new(4.0, 4).estimate(&[1.0, -1.0, 1.0, -1.0, 0.0, 0.0]);
        assert_density(&psd.density, &[1.0 / 48.0, 5.0 / 24.0, 17.0 / 48.0]);
    }
}
