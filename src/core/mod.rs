//! Core signal processing and detection logic.
//!
//! This module contains:
//! - Window slicing over a segment's samples
//! - Welch power spectral density estimation
//! - Feature extraction (relative band powers, spectral entropy, RMS)
//! - The scorer boundary and the built-in logistic model
//! - Consecutive-detection alerting
//! - Real-time pacing and cooperative cancellation

pub mod alert;
pub mod features;
pub mod pacer;
pub mod scorer;
pub mod spectral;
pub mod windowing;

pub use alert::{AlertEvent, AlertStateMachine, AlertStep, DetectionEvent};
pub use features::{window_features, FeatureExtractor, FeatureVector, WindowFeatureSet, EPSILON};
pub use pacer::{CancelToken, PaceOutcome, Pacer};
pub use scorer::{checked_score, DetectionScorer, FnScorer, LogisticScorer, ScoreError};
pub use spectral::{Psd, WelchEstimator};
pub use windowing::{Window, WindowSpec, Windows};
