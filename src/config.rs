//! Configuration for the seizure stream pipeline.
//!
//! Every tunable of the windowing, feature extraction, scoring and alerting
//! stages lives here so that the stages can never disagree on sampling rate
//! or band edges.

use crate::dataset::types::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for a pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling rate of every signal, in Hz
    pub sampling_rate: f64,

    /// Window length in samples
    pub window_length: usize,

    /// Offset between consecutive window starts, in samples
    pub step_size: usize,

    /// Upper bound on the Welch sub-segment length (clamped to the window length)
    pub welch_segment_length: usize,

    /// Ordered frequency bands; the order fixes the feature vector layout
    pub bands: Vec<BandDefinition>,

    /// Probability at or above which a window counts as a detection
    pub decision_threshold: f64,

    /// Consecutive detections required to raise an alert
    pub alert_threshold: u32,

    /// Replay speed multiplier (1.0 = real time)
    pub simulated_speed: f64,

    /// Whether streaming sessions sleep between windows
    pub pacing: bool,

    /// Source-set to label convention
    pub set_labels: SetLabels,

    /// Root directory holding one sub-directory per source set
    pub data_dir: PathBuf,

    /// Fraction of each source set held out for streaming
    pub test_size: f64,

    /// Seed for the stratified split and demo segment choice
    pub split_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_rate: 173.61,
            window_length: 173, // ~1 s
            step_size: 87,      // 50% overlap
            welch_segment_length: 128,
            bands: BandDefinition::reference_bands(),
            decision_threshold: 0.5,
            alert_threshold: 6, // ~3 s of sustained detections
            simulated_speed: 5.0,
            pacing: true,
            set_labels: SetLabels::default(),
            data_dir: PathBuf::from("../data/raw"),
            test_size: 0.2,
            split_seed: 2,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("seizure-stream")
            .join("config.json")
    }

    /// Check every constraint the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sampling_rate.is_finite() || self.sampling_rate <= 0.0 {
            return Err(invalid(format!(
                "sampling_rate must be positive, got {}",
                self.sampling_rate
            )));
        }
        if self.window_length == 0 {
            return Err(invalid("window_length must be positive"));
        }
        if self.step_size == 0 {
            return Err(invalid("step_size must be positive"));
        }
        if self.welch_segment_length == 0 {
            return Err(invalid("welch_segment_length must be positive"));
        }
        if self.bands.is_empty() {
            return Err(invalid("at least one frequency band is required"));
        }
        for band in &self.bands {
            band.validate()?;
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(invalid(format!(
                "decision_threshold must lie in [0, 1], got {}",
                self.decision_threshold
            )));
        }
        if self.alert_threshold == 0 {
            return Err(invalid("alert_threshold must be at least 1"));
        }
        if !self.simulated_speed.is_finite() || self.simulated_speed <= 0.0 {
            return Err(invalid(format!(
                "simulated_speed must be positive, got {}",
                self.simulated_speed
            )));
        }
        if Duration::try_from_secs_f64(self.pacing_secs()).is_err() {
            return Err(invalid(format!(
                "simulated_speed {} makes the pacing interval unrepresentable",
                self.simulated_speed
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(invalid(format!(
                "test_size must lie in (0, 1), got {}",
                self.test_size
            )));
        }
        Ok(())
    }

    /// Wall-clock time a single step represents at the configured replay speed.
    ///
    /// Saturates at `Duration::MAX` for configs that `validate` rejects.
    pub fn pacing_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.pacing_secs()).unwrap_or(Duration::MAX)
    }

    fn pacing_secs(&self) -> f64 {
        (self.step_size as f64 / self.sampling_rate) / self.simulated_speed
    }

    /// Number of values in every feature vector.
    pub fn feature_len(&self) -> usize {
        self.bands.len() + 2
    }
}

/// A named frequency band, inclusive on both edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub name: String,
    pub lo_hz: f64,
    pub hi_hz: f64,
}

impl BandDefinition {
    /// Create a new band from its name and edges in Hz.
    pub fn new(name: impl Into<String>, lo_hz: f64, hi_hz: f64) -> Self {
        Self {
            name: name.into(),
            lo_hz,
            hi_hz,
        }
    }

    /// Classical EEG rhythm bands.
    pub fn reference_bands() -> Vec<Self> {
        vec![
            Self::new("delta", 0.5, 4.0),
            Self::new("theta", 4.0, 8.0),
            Self::new("alpha", 8.0, 13.0),
            Self::new("beta", 13.0, 30.0),
            Self::new("gamma", 30.0, 60.0),
        ]
    }

    /// Check if a frequency falls within this band.
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.lo_hz && freq_hz <= self.hi_hz
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(invalid("band names must not be empty"));
        }
        if !self.lo_hz.is_finite() || !self.hi_hz.is_finite() {
            return Err(invalid(format!("band '{}' has non-finite edges", self.name)));
        }
        if self.lo_hz < 0.0 || self.lo_hz >= self.hi_hz {
            return Err(invalid(format!(
                "band '{}' has malformed range [{}, {}]",
                self.name, self.lo_hz, self.hi_hz
            )));
        }
        Ok(())
    }
}

/// Mapping from source-set identifier to ground-truth label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetLabels(BTreeMap<String, Label>);

impl Default for SetLabels {
    /// Only set S holds ictal recordings.
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("F".to_string(), Label::Normal);
        labels.insert("N".to_string(), Label::Normal);
        labels.insert("O".to_string(), Label::Normal);
        labels.insert("S".to_string(), Label::Seizure);
        labels.insert("Z".to_string(), Label::Normal);
        Self(labels)
    }
}

impl SetLabels {
    /// Parse overrides such as `S=1,Z=0`, applied on top of the defaults.
    pub fn from_csv(s: &str) -> Result<Self, ConfigError> {
        let mut labels = Self::default();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (set, value) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::ParseError(format!("expected SET=LABEL, got '{entry}'")))?;
            let value: u8 = value
                .trim()
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("label for '{set}': {e}")))?;
            let label = Label::try_from(value).map_err(ConfigError::ParseError)?;
            labels.0.insert(set.trim().to_string(), label);
        }
        Ok(labels)
    }

    /// Get the label of a source set, if it is known.
    pub fn get(&self, set_name: &str) -> Option<Label> {
        self.0.get(set_name).copied()
    }

    /// Iterate in set-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Label)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
