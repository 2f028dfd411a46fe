//! Real-time pacing of replayed recordings.
//!
//! A pacer sleeps between windows so a replay advances at the acquisition
//! rate times the configured speed. It never touches window data, and a
//! disabled pacer returns immediately for batch scoring.

use crate::config::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep; bounds how late a cancellation is noticed.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cooperative stop flag shared between a controller and its streams.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every holder of this token to stop at its next window boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a pacing suspension ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    Completed,
    Cancelled,
}

/// Sleeps a fixed interval between consecutive windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    interval: Option<Duration>,
}

impl Pacer {
    /// Create a pacer that sleeps `interval` between windows.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
        }
    }

    /// A pacer that never sleeps.
    pub fn disabled() -> Self {
        Self { interval: None }
    }

    /// `(step / sampling_rate) / simulated_speed`, or disabled when pacing is off.
    pub fn from_config(config: &Config) -> Self {
        if config.pacing {
            Self::new(config.pacing_interval())
        } else {
            Self::disabled()
        }
    }

    /// Get the pacing interval, or `None` when disabled.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Check whether the pacer sleeps at all.
    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Suspend for one interval, waking early if `cancel` fires.
    pub fn pace(&self, cancel: &CancelToken) -> PaceOutcome {
        let Some(interval) = self.interval else {
            return if cancel.is_cancelled() {
                PaceOutcome::Cancelled
            } else {
                PaceOutcome::Completed
            };
        };

        // An interval past the clock's range only ends by cancellation.
        let deadline = Instant::now().checked_add(interval);
        loop {
            if cancel.is_cancelled() {
                return PaceOutcome::Cancelled;
            }
            let now = Instant::now();
            let left = match deadline {
                Some(deadline) if now >= deadline => return PaceOutcome::Completed,
                Some(deadline) => deadline - now,
                None => MAX_SLEEP_SLICE,
            };
            std::thread::sleep(left.min(MAX_SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_pacer_returns_immediately() {
        let pacer = Pacer::disabled();
        let start = Instant::now();
        assert_eq!(pacer.pace(&CancelToken::new()), PaceOutcome::Completed);
        assert!(start.elapsed() < Duration::from_millis(20));
        assert!(!pacer.is_enabled());
    }

    #[test]
    fn test_pacer_sleeps_interval() {
        let pacer = Pacer::new(Duration::from_millis(30));
        let start = Instant::now();
        assert_eq!(pacer.pace(&CancelToken::new()), PaceOutcome::Completed);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_interrupts_sleep() {
        let pacer = Pacer::new(Duration::from_secs(30));
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        assert_eq!(pacer.pace(&cancel), PaceOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            sampling_rate: 100.0,
            step_size: 50,
            simulated_speed: 2.0,
            ..Config::default()
        };
        assert_eq!(
            Pacer::from_config(&config).interval(),
            Some(Duration::from_secs_f64(0.25))
        );

        let config = Config {
            pacing: false,
            ..config
        };
        assert!(!Pacer::from_config(&config).is_enabled());
    }

    #[test]
    fn test_unbounded_interval_still_cancels() {
        let config = Config {
            simulated_speed: 1e-300,
            ..Config::default()
        };
        let pacer = Pacer::from_config(&config);
        assert_eq!(pacer.interval(), Some(Duration::MAX));

        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(pacer.pace(&cancel), PaceOutcome::Cancelled);
    }
}
