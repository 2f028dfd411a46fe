//! Detection scoring boundary.
//!
//! A scorer maps one feature vector to the probability of the seizure class.
//! Scorers are shared read-only across concurrently streamed segments, so the
//! trait requires `Send + Sync` and takes `&self`.

use crate::config::ConfigError;
use crate::core::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reasons a window could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreError {
    /// The feature vector does not have the length the model was fitted on
    DimensionMismatch { expected: usize, actual: usize },
    /// The model returned something that is not a probability
    InvalidProbability { value: f64 },
    /// The model itself failed
    Model { message: String },
}

impl std::fmt::Display for ScoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreError::DimensionMismatch { expected, actual } => {
                write!(f, "expected {expected} features, got {actual}")
            }
            ScoreError::InvalidProbability { value } => {
                write!(f, "scorer returned {value}, which is not a probability")
            }
            ScoreError::Model { message } => write!(f, "scorer failed: {message}"),
        }
    }
}

impl std::error::Error for ScoreError {}

/// Probability model for the seizure class.
pub trait DetectionScorer: Send + Sync {
    /// Probability in `[0, 1]` that the window is ictal.
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError>;
}

impl<S: DetectionScorer + ?Sized> DetectionScorer for std::sync::Arc<S> {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        (**self).score(features)
    }
}

impl<S: DetectionScorer + ?Sized> DetectionScorer for Box<S> {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        (**self).score(features)
    }
}

/// Score a window and reject anything outside `[0, 1]`.
pub fn checked_score<S: DetectionScorer + ?Sized>(
    scorer: &S,
    features: &FeatureVector,
) -> Result<f64, ScoreError> {
    let value = scorer.score(features)?;
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ScoreError::InvalidProbability { value })
    }
}

/// Adapter turning a closure into a scorer.
pub struct FnScorer<F>(F);

impl<F> FnScorer<F>
where
    F: Fn(&FeatureVector) -> Result<f64, ScoreError> + Send + Sync,
{
    /// Create a new scorer from a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> DetectionScorer for FnScorer<F>
where
    F: Fn(&FeatureVector) -> Result<f64, ScoreError> + Send + Sync,
{
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        (self.0)(features)
    }
}

/// Standardised logistic regression.
///
/// Each feature is centred and scaled (a zero scale is treated as 1), then
/// combined linearly and squashed through the logistic function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticScorer {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticScorer {
    /// Create a new model, checking that the parameter lengths agree.
    pub fn new(
        means: Vec<f64>,
        scales: Vec<f64>,
        weights: Vec<f64>,
        bias: f64,
    ) -> Result<Self, ConfigError> {
        let scorer = Self {
            means,
            scales,
            weights,
            bias,
        };
        scorer.validate()?;
        Ok(scorer)
    }

    /// Load model parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let scorer: LogisticScorer =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        scorer.validate()?;
        Ok(scorer)
    }

    /// Number of features the model expects.
    pub fn feature_len(&self) -> usize {
        self.weights.len()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let n = self.weights.len();
        if n == 0 || self.means.len() != n || self.scales.len() != n {
            return Err(ConfigError::Invalid(format!(
                "model parameter lengths disagree: {} means, {} scales, {} weights",
                self.means.len(),
                self.scales.len(),
                n
            )));
        }
        let all_finite = self
            .means
            .iter()
            .chain(&self.scales)
            .chain(&self.weights)
            .chain(std::iter::once(&self.bias))
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ConfigError::Invalid("model parameters must be finite".into()));
        }
        Ok(())
    }
}

impl DetectionScorer for LogisticScorer {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        if features.len() != self.weights.len() {
            return Err(ScoreError::DimensionMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }

        let logit = features
            .as_slice()
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .zip(&self.weights)
            .fold(self.bias, |acc, (((&x, &mean), &scale), &w)| {
                let scale = if scale == 0.0 { 1.0 } else { scale };
                acc + w * (x - mean) / scale
            });

        Ok(sigmoid(logit))
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(values: &[f64]) -> FeatureVector {
        FeatureVector::new(values.to_vec())
    }

    #[test]
    fn test_logistic_scorer() {
        let scorer = LogisticScorer::new(vec![0.0, 1.0], vec![1.0, 2.0], vec![1.0, -1.0], 0.0).unwrap();
        let p = scorer.score(&features(&[0.0, 1.0])).unwrap();
        assert!((p - 0.5).abs() < 1e-12);

        let high = scorer.score(&features(&[10.0, 1.0])).unwrap();
        assert!(high > 0.99);
        let low = scorer.score(&features(&[-10.0, 1.0])).unwrap();
        assert!(low < 0.01);
    }

    #[test]
    fn test_zero_scale_is_treated_as_unit() {
        let scorer = LogisticScorer::new(vec![0.0], vec![0.0], vec![1.0], 0.0).unwrap();
        let p = scorer.score(&features(&[2.0])).unwrap();
        assert!(p.is_finite());
        assert!((p - sigmoid(2.0)).abs() < 1e-15);
    }

    #[test]
    fn test_dimension_mismatch() {
        let scorer = LogisticScorer::new(vec![0.0; 7], vec![1.0; 7], vec![0.1; 7], 0.0).unwrap();
        assert_eq!(
            scorer.score(&features(&[1.0, 2.0])),
            Err(ScoreError::DimensionMismatch {
                expected: 7,
                actual: 2
            })
        );
    }

    #[test]
    fn test_rejects_inconsistent_parameters() {
        assert!(LogisticScorer::new(vec![0.0], vec![1.0, 1.0], vec![1.0], 0.0).is_err());
        assert!(LogisticScorer::new(vec![], vec![], vec![], 0.0).is_err());
        assert!(LogisticScorer::new(vec![0.0], vec![1.0], vec![f64::NAN], 0.0).is_err());
    }

    #[test]
    fn test_checked_score_rejects_out_of_range() {
        let scorer = FnScorer::new(|_| Ok(1.5));
        assert!(matches!(
            checked_score(&scorer, &features(&[0.0])),
            Err(ScoreError::InvalidProbability { .. })
        ));

        let scorer = FnScorer::new(|_| Ok(f64::NAN));
        assert!(checked_score(&scorer, &features(&[0.0])).is_err());

        let scorer = FnScorer::new(|_| Ok(0.0));
        assert_eq!(checked_score(&scorer, &features(&[0.0])), Ok(0.0));
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert!(sigmoid(-1000.0).is_finite());
    }

    #[test]
    fn test_load_from_json() {
        let path = std::env::temp_dir().join("seizure-stream-scorer-test.json");
        std::fs::write(
            &path,
            r#"{"means":[0.0,0.0],"scales":[1.0,1.0],"weights":[2.0,0.0],"bias":-1.0}"#,
        )
        .unwrap();
        let scorer = LogisticScorer::load(&path).unwrap();
        assert_eq!(scorer.feature_len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
