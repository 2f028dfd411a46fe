//! Run-level audit counters.
//!
//! The audit log tracks what the detector has processed during a session.
//! It holds counters only; no signal data or alert history is retained.

use crate::stream::session::StreamSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current session.
#[derive(Debug)]
pub struct AuditLog {
    /// Number of segments streamed, finished or not
    segments_streamed: AtomicU64,
    /// Number of windows scored
    windows_processed: AtomicU64,
    /// Number of windows predicted seizure
    positive_detections: AtomicU64,
    /// Number of windows the scorer could not score
    score_failures: AtomicU64,
    /// Number of alerts raised
    alerts_raised: AtomicU64,
    /// Number of streams stopped by cancellation
    cancelled_sessions: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl AuditLog {
    /// Create a new audit log with all counters at zero.
    pub fn new() -> Self {
        Self {
            segments_streamed: AtomicU64::new(0),
            windows_processed: AtomicU64::new(0),
            positive_detections: AtomicU64::new(0),
            score_failures: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            cancelled_sessions: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Fold a finished stream into the counters.
    pub fn record_summary(&self, summary: &StreamSummary) {
        self.segments_streamed.fetch_add(1, Ordering::Relaxed);
        self.windows_processed
            .fetch_add(summary.windows_processed as u64, Ordering::Relaxed);
        self.positive_detections
            .fetch_add(summary.detections as u64, Ordering::Relaxed);
        self.score_failures
            .fetch_add(summary.score_failures as u64, Ordering::Relaxed);
        self.alerts_raised
            .fetch_add(summary.alerts as u64, Ordering::Relaxed);
        if summary.cancelled {
            self.cancelled_sessions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get the current statistics.
    pub fn stats(&self) -> AuditStats {
        AuditStats {
            segments_streamed: self.segments_streamed.load(Ordering::Relaxed),
            windows_processed: self.windows_processed.load(Ordering::Relaxed),
            positive_detections: self.positive_detections.load(Ordering::Relaxed),
            score_failures: self.score_failures.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            cancelled_sessions: self.cancelled_sessions.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Segments streamed: {}\n\
             - Windows processed: {}\n\
             - Seizure detections: {}\n\
             - Scorer failures: {}\n\
             - Alerts raised: {}\n\
             - Cancelled streams: {}\n\
             - Session duration: {} seconds",
            stats.segments_streamed,
            stats.windows_processed,
            stats.positive_detections,
            stats.score_failures,
            stats.alerts_raised,
            stats.cancelled_sessions,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.segments_streamed.store(0, Ordering::Relaxed);
        self.windows_processed.store(0, Ordering::Relaxed);
        self.positive_detections.store(0, Ordering::Relaxed);
        self.score_failures.store(0, Ordering::Relaxed);
        self.alerts_raised.store(0, Ordering::Relaxed);
        self.cancelled_sessions.store(0, Ordering::Relaxed);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the audit counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub segments_streamed: u64,
    pub windows_processed: u64,
    pub positive_detections: u64,
    pub score_failures: u64,
    pub alerts_raised: u64,
    pub cancelled_sessions: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared audit log.
pub type SharedAuditLog = Arc<AuditLog>;

/// Create a new shared audit log.
pub fn create_shared_log() -> SharedAuditLog {
    Arc::new(AuditLog::new())
}
