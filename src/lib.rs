//! Seizure Stream - windowed spectral seizure detection for single-channel EEG.
//!
//! This library replays recorded EEG segments window by window, turns each
//! window into a compact spectral feature vector, scores it with a pluggable
//! probability model, and raises an alert once enough consecutive windows
//! are predicted ictal.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Seizure Stream                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Dataset   │──▶│  Windowing  │──▶│  Features   │        │
//! │  │  (segments) │   │ (len, step) │   │  (Welch)    │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                           ▲                 │               │
//! │                           │                 ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Audit     │◀──│   Alert     │◀──│   Scorer    │        │
//! │  │    Log      │   │  (debounce) │   │ (P seizure) │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                           │                                 │
//! │                     Pacer (replay speed, cancellation)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use seizure_stream::{
//!     CancelToken, Config, EventRecorder, Label, LogisticScorer, Pacer, Pipeline, Segment,
//! };
//! use std::path::Path;
//!
//! let config = Config::default();
//! let scorer = LogisticScorer::load(Path::new("model.json")).expect("model");
//! let pipeline = Pipeline::new(config, scorer).expect("valid config");
//!
//! let segment = Segment::new(vec![0.0; 4097], Label::Normal, "Z", "Z001");
//! let mut recorder = EventRecorder::default();
//! let summary = pipeline.run(&segment, &Pacer::disabled(), &CancelToken::new(), &mut recorder);
//! println!("{} alerts", summary.alerts);
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod dataset;
pub mod stream;

// Re-export key types at crate root for convenience
pub use audit::{create_shared_log, AuditLog, AuditStats, SharedAuditLog};
pub use config::{BandDefinition, Config, ConfigError, SetLabels};
pub use core::{
    AlertEvent, AlertStateMachine, CancelToken, DetectionEvent, DetectionScorer,
    FeatureExtractor, FeatureVector, FnScorer, LogisticScorer, Pacer, ScoreError, WindowSpec,
};
pub use dataset::{load_dataset, stratified_split, DatasetError, Label, Segment};
pub use stream::{EventRecorder, Pipeline, StreamEvent, StreamMessage, StreamObserver, StreamSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label convention shown to operators.
pub const LABEL_CONVENTION: &str = r#"
Bonn EEG set labels
===================

  S  seizure (ictal)           -> 1
  F  interictal, epileptogenic -> 0
  N  interictal, contralateral -> 0
  O  healthy, eyes closed      -> 0
  Z  healthy, eyes open        -> 0

Only ictal recordings count as positive. Override with
`--labels S=1,F=0,...` or the `set_labels` config entry.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_convention_matches_defaults() {
        let labels = SetLabels::default();
        for (set, label) in labels.iter() {
            let line = LABEL_CONVENTION
                .lines()
                .find(|l| l.trim_start().starts_with(&format!("{set} ")))
                .unwrap();
            assert!(line.ends_with(&format!("-> {}", u8::from(label))));
        }
    }
}
