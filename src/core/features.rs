//! Feature computation from signal windows.
//!
//! Each window becomes a fixed-length vector laid out as
//! `[relative band powers..., spectral entropy, rms]`, bands in declaration
//! order. The vector carries no channel names; use [`FeatureExtractor::feature_names`]
//! to label it.

use crate::config::{BandDefinition, Config, ConfigError};
use crate::core::spectral::{Psd, WelchEstimator};
use crate::core::windowing::WindowSpec;
use crate::dataset::types::{Label, Segment};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::io::Write;

/// Guard added to divisors so silent windows stay finite.
pub const EPSILON: f64 = 1e-12;

/// Ordered feature values for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap raw feature values.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Get the values in layout order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Relative band powers, in band order.
    pub fn band_powers(&self) -> &[f64] {
        &self.0[..self.0.len().saturating_sub(2)]
    }

    /// Normalised spectral entropy; NaN for a vector too short to hold one.
    pub fn spectral_entropy(&self) -> f64 {
        self.0.iter().rev().nth(1).copied().unwrap_or(f64::NAN)
    }

    /// Root-mean-square amplitude; NaN for an empty vector.
    pub fn rms(&self) -> f64 {
        self.0.last().copied().unwrap_or(f64::NAN)
    }
}

/// Maps windows to feature vectors for a fixed band layout and sampling rate.
///
/// Extraction is pure: the same samples always give bit-identical output.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    estimator: WelchEstimator,
    bands: Vec<BandDefinition>,
}

impl FeatureExtractor {
    /// Create a new extractor. At least one band is required.
    pub fn new(
        sampling_rate: f64,
        welch_segment_length: usize,
        bands: Vec<BandDefinition>,
    ) -> Result<Self, ConfigError> {
        if bands.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one frequency band is required".into(),
            ));
        }
        Ok(Self {
            estimator: WelchEstimator::new(sampling_rate, welch_segment_length),
            bands,
        })
    }

    /// Create an extractor from the config's sampling rate, Welch length and bands.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.sampling_rate,
            config.welch_segment_length,
            config.bands.clone(),
        )
    }

    /// Get the bands, in feature order.
    pub fn bands(&self) -> &[BandDefinition] {
        &self.bands
    }

    /// Number of values in every vector this extractor produces.
    pub fn feature_len(&self) -> usize {
        self.bands.len() + 2
    }

    /// Names of the feature channels, in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        self.bands
            .iter()
            .map(|b| format!("{}_power_norm", b.name))
            .chain(["entropy".to_string(), "rms".to_string()])
            .collect()
    }

    /// Compute the feature vector of one window.
    pub fn extract(&self, samples: &[f64]) -> FeatureVector {
        let psd = self.estimator.estimate(samples);

        let total_power = psd.total_power();
        let mut values: Vec<f64> = self
            .bands
            .iter()
            .map(|b| psd.band_power(b) / (total_power + EPSILON))
            .collect();

        values.push(spectral_entropy(&psd));
        values.push(rms(samples));

        FeatureVector(values)
    }
}

/// Shannon entropy of the normalised PSD, divided by `ln(bins)`.
fn spectral_entropy(psd: &Psd) -> f64 {
    let bins = psd.bins();
    if bins <= 1 {
        return 0.0;
    }

    let total: f64 = psd.density.iter().sum();
    let p: Vec<f64> = psd.density.iter().map(|&x| x / (total + EPSILON)).collect();

    let mass: f64 = p.iter().sum();
    if mass <= 0.0 {
        return 0.0;
    }

    let entropy: f64 = p
        .iter()
        .map(|&x| x / mass)
        .filter(|&q| q > 0.0)
        .map(|q| -q * q.ln())
        .sum();

    entropy / (bins as f64).ln()
}

/// Root-mean-square amplitude of the samples.
fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().quadratic_mean()
}

/// Feature matrix over every window of a set of segments.
#[derive(Debug, Clone, Default)]
pub struct WindowFeatureSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<Label>,
}

impl WindowFeatureSet {
    /// Number of windows.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Write one row per window: the feature columns, then the 0/1 label.
    pub fn write_csv<W: Write>(&self, feature_names: &[String], mut out: W) -> std::io::Result<()> {
        writeln!(out, "{},label", feature_names.join(","))?;
        for (features, label) in self.features.iter().zip(&self.labels) {
            let row: Vec<String> = features.as_slice().iter().map(|v| v.to_string()).collect();
            writeln!(out, "{},{}", row.join(","), u8::from(*label))?;
        }
        out.flush()
    }
}

/// Extract features from every window across a list of segments.
///
/// This is the hand-off format for training a scorer outside this crate.
pub fn window_features(
    segments: &[Segment],
    spec: &WindowSpec,
    extractor: &FeatureExtractor,
) -> WindowFeatureSet {
    let mut set = WindowFeatureSet::default();
    for segment in segments {
        for window in spec.windows(segment) {
            set.features.push(extractor.extract(window.samples));
            set.labels.push(window.label);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_extractor() -> FeatureExtractor {
        FeatureExtractor::from_config(&Config::default()).unwrap()
    }

    /// Bands that tile `[0, fs/2]` on a 1 Hz grid without sharing a bin.
    fn partition_extractor() -> FeatureExtractor {
        FeatureExtractor::new(
            128.0,
            128,
            vec![
                BandDefinition::new("low", 0.0, 9.5),
                BandDefinition::new("mid", 9.5, 30.5),
                BandDefinition::new("high", 30.5, 64.0),
            ],
        )
        .unwrap()
    }

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5
            })
            .collect()
    }

    #[test]
    fn test_feature_layout() {
        let extractor = reference_extractor();
        assert_eq!(extractor.feature_len(), 7);
        assert_eq!(
            extractor.feature_names(),
            vec![
                "delta_power_norm",
                "theta_power_norm",
                "alpha_power_norm",
                "beta_power_norm",
                "gamma_power_norm",
                "entropy",
                "rms"
            ]
        );

        let features = extractor.extract(&noise(173, 1));
        assert_eq!(features.len(), 7);
        assert_eq!(features.band_powers().len(), 5);
    }

    #[test]
    fn test_relative_powers_sum_to_one_on_partition() {
        let extractor = partition_extractor();
        for seed in 0..5 {
            let features = extractor.extract(&noise(256, seed));
            let sum: f64 = features.band_powers().iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "sum {sum}");
        }
    }

    #[test]
    fn test_sine_lands_in_its_band() {
        let extractor = partition_extractor();
        let samples: Vec<f64> = (0..256)
            .map(|i| (2.0 * std::f64::consts::PI * 20.0 * i as f64 / 128.0).sin())
            .collect();
        let features = extractor.extract(&samples);
        assert!(features.band_powers()[1] > 0.99);
    }

    #[test]
    fn test_entropy_bounds() {
        let extractor = reference_extractor();
        for seed in 0..10 {
            let entropy = extractor.extract(&noise(173, seed)).spectral_entropy();
            assert!((-1e-12..=1.0 + 1e-12).contains(&entropy), "entropy {entropy}");
        }
    }

    #[test]
    fn test_pure_tone_has_lower_entropy_than_noise() {
        let extractor = partition_extractor();
        let tone: Vec<f64> = (0..256)
            .map(|i| (2.0 * std::f64::consts::PI * 16.0 * i as f64 / 128.0).sin())
            .collect();
        let tone_entropy = extractor.extract(&tone).spectral_entropy();
        let noise_entropy = extractor.extract(&noise(256, 3)).spectral_entropy();
        assert!(tone_entropy < noise_entropy);
    }

    #[test]
    fn test_single_bin_entropy_is_zero() {
        let extractor = FeatureExtractor::new(173.61, 1, BandDefinition::reference_bands()).unwrap();
        let features = extractor.extract(&[1.0, 2.0, 3.0]);
        assert_eq!(features.spectral_entropy(), 0.0);
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_silent_and_constant_windows_are_finite() {
        let extractor = reference_extractor();

        let silent = extractor.extract(&[0.0; 173]);
        assert!(silent.as_slice().iter().all(|v| v.is_finite()));
        assert_eq!(silent.rms(), 0.0);
        assert_eq!(silent.spectral_entropy(), 0.0);

        let constant = extractor.extract(&[4.0; 173]);
        assert!(constant.as_slice().iter().all(|v| v.is_finite()));
        assert!((constant.rms() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rms_scale_equivariance() {
        let samples = noise(173, 11);
        let base = rms(&samples);
        for k in [-3.0, 0.5, 2.0, 10.0] {
            let scaled: Vec<f64> = samples.iter().map(|x| k * x).collect();
            let expected = f64::abs(k) * base;
            assert!((rms(&scaled) - expected).abs() <= 1e-12 * expected.max(1.0));
        }
    }

    #[test]
    fn test_extraction_is_bit_identical() {
        let extractor = reference_extractor();
        let samples = noise(173, 5);
        let a = extractor.extract(&samples);
        let b = extractor.extract(&samples);
        let bits_a: Vec<u64> = a.as_slice().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u64> = b.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_window_features_pairs_labels() {
        let extractor = reference_extractor();
        let spec = WindowSpec::new(173, 87).unwrap();
        let segments = vec![
            Segment::new(noise(400, 1), Label::Normal, "Z", "Z001"),
            Segment::new(noise(100, 2), Label::Seizure, "S", "S001"),
            Segment::new(noise(260, 3), Label::Seizure, "S", "S002"),
        ];

        let set = window_features(&segments, &spec, &extractor);
        // 400 -> 3 windows, 100 -> 0, 260 -> 2
        assert_eq!(set.len(), 5);
        assert_eq!(
            set.labels,
            vec![
                Label::Normal,
                Label::Normal,
                Label::Normal,
                Label::Seizure,
                Label::Seizure
            ]
        );
    }

    #[test]
    fn test_rejects_empty_bands() {
        assert!(FeatureExtractor::new(173.61, 128, Vec::new()).is_err());
    }

    #[test]
    fn test_write_csv() {
        let extractor = partition_extractor();
        let spec = WindowSpec::new(128, 128).unwrap();
        let segments = vec![Segment::new(noise(256, 4), Label::Seizure, "S", "S001")];
        let set = window_features(&segments, &spec, &extractor);

        let mut out = Vec::new();
        set.write_csv(&extractor.feature_names(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "low_power_norm,mid_power_norm,high_power_norm,entropy,rms,label"
        );
        assert!(lines[1].ends_with(",1"));
        assert_eq!(lines[1].split(',').count(), 6);
    }
}
