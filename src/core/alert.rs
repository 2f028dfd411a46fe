//! Consecutive-detection alerting.
//!
//! An alert is raised when the number of back-to-back positive windows
//! reaches the threshold. Any negative window resets the run, and so does
//! raising the alert: the next alert needs a fresh run.

use crate::config::ConfigError;
use crate::core::scorer::ScoreError;
use serde::{Deserialize, Serialize};

/// Per-window scoring outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Position of the window in its segment (0-based)
    pub window_index: usize,
    /// Sample offset of the window
    pub offset: usize,
    /// Seizure probability, absent when scoring failed
    pub probability: Option<f64>,
    /// Whether the window counted as a detection
    pub prediction: bool,
    /// Run length after this window, before any alert reset
    pub consecutive: u32,
    /// Why the window could not be scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScoreError>,
}

impl DetectionEvent {
    /// 1-based window number, as shown to operators.
    pub fn window_number(&self) -> usize {
        self.window_index + 1
    }
}

/// Raised when a run of detections reaches the alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Index of the window that completed the run (0-based)
    pub window_index: usize,
    /// Run length that triggered the alert
    pub count: u32,
}

impl AlertEvent {
    /// 1-based window number, as shown to operators.
    pub fn window_number(&self) -> usize {
        self.window_index + 1
    }
}

/// Result of feeding one prediction into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertStep {
    /// Run length after the update, before any alert reset
    pub consecutive: u32,
    pub alert: Option<AlertEvent>,
}

/// Debounce over a strictly ordered sequence of predictions.
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    threshold: u32,
    consecutive: u32,
}

impl AlertStateMachine {
    /// Create a new state machine. A zero threshold is rejected.
    pub fn new(threshold: u32) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::Invalid(
                "alert_threshold must be at least 1".into(),
            ));
        }
        Ok(Self {
            threshold,
            consecutive: 0,
        })
    }

    /// Current run length.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Feed the prediction for window `window_index`.
    ///
    /// Windows must be fed in order. A window that could not be scored
    /// should be fed as `false`.
    pub fn observe(&mut self, window_index: usize, prediction: bool) -> AlertStep {
        if prediction {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }

        let consecutive = self.consecutive;
        let alert = if consecutive >= self.threshold {
            self.consecutive = 0;
            Some(AlertEvent {
                window_index,
                count: consecutive,
            })
        } else {
            None
        };

        AlertStep { consecutive, alert }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(threshold: u32, predictions: &[u8]) -> (Vec<AlertEvent>, AlertStateMachine) {
        let mut machine = AlertStateMachine::new(threshold).unwrap();
        let alerts = predictions
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| machine.observe(i, p == 1).alert)
            .collect();
        (alerts, machine)
    }

    #[test]
    fn test_interrupted_run_then_alert() {
        let (alerts, machine) = run(3, &[1, 1, 0, 1, 1, 1, 1]);
        assert_eq!(
            alerts,
            vec![AlertEvent {
                window_index: 5,
                count: 3
            }]
        );
        assert_eq!(alerts[0].window_number(), 6);
        // The trailing positive starts a new run.
        assert_eq!(machine.consecutive(), 1);
    }

    #[test]
    fn test_count_resets_after_alert() {
        let mut machine = AlertStateMachine::new(2).unwrap();
        assert_eq!(machine.observe(0, true).alert, None);
        let step = machine.observe(1, true);
        assert_eq!(step.consecutive, 2);
        assert_eq!(
            step.alert,
            Some(AlertEvent {
                window_index: 1,
                count: 2
            })
        );
        assert_eq!(machine.consecutive(), 0);
    }

    #[test]
    fn test_sustained_run_realerts_every_threshold() {
        let (alerts, _) = run(3, &[1; 9]);
        let indices: Vec<usize> = alerts.iter().map(|a| a.window_index).collect();
        assert_eq!(indices, vec![2, 5, 8]);
        assert!(alerts.iter().all(|a| a.count == 3));
    }

    #[test]
    fn test_negative_resets_before_threshold() {
        let (alerts, machine) = run(6, &[1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1]);
        assert!(alerts.is_empty());
        assert_eq!(machine.consecutive(), 5);
    }

    #[test]
    fn test_no_implicit_alert_at_end() {
        let (alerts, machine) = run(4, &[0, 1, 1, 1]);
        assert!(alerts.is_empty());
        assert_eq!(machine.consecutive(), 3);
    }

    #[test]
    fn test_threshold_of_one() {
        let (alerts, _) = run(1, &[1, 0, 1]);
        let indices: Vec<usize> = alerts.iter().map(|a| a.window_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_counter_monotonic_while_positive() {
        let mut machine = AlertStateMachine::new(100).unwrap();
        let mut last = 0;
        for i in 0..50 {
            let step = machine.observe(i, true);
            assert_eq!(step.consecutive, last + 1);
            last = step.consecutive;
        }
    }

    #[test]
    fn test_rejects_zero_threshold() {
        assert!(AlertStateMachine::new(0).is_err());
    }
}
