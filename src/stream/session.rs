//! Streaming a segment through the detection pipeline.
//!
//! Each segment gets its own alert state; windows are scored strictly in
//! offset order. Events can be pulled lazily from [`SegmentStream`] or pushed
//! to a [`StreamObserver`] by [`Pipeline::run`], which also paces the replay
//! and checks for cancellation at every window boundary.

use crate::config::{Config, ConfigError};
use crate::core::alert::{AlertEvent, AlertStateMachine, DetectionEvent};
use crate::core::features::FeatureExtractor;
use crate::core::pacer::{CancelToken, PaceOutcome, Pacer};
use crate::core::scorer::{checked_score, DetectionScorer};
use crate::core::windowing::{Window, WindowSpec, Windows};
use crate::dataset::types::{Label, Segment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An item of a segment's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Detection(DetectionEvent),
    Alert(AlertEvent),
}

/// Receives a segment's events as they happen.
pub trait StreamObserver {
    fn on_start(&mut self, _segment: &Segment, _windows: usize) {}

    fn on_detection(&mut self, segment: &Segment, event: &DetectionEvent);

    fn on_alert(&mut self, segment: &Segment, event: &AlertEvent);

    fn on_finish(&mut self, _summary: &StreamSummary) {}
}

/// Observer that keeps every event in order.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    pub events: Vec<StreamEvent>,
}

impl EventRecorder {
    /// Iterate the detection events in order.
    pub fn detections(&self) -> impl Iterator<Item = &DetectionEvent> {
        self.events.iter().filter_map(|e| match e {
            StreamEvent::Detection(d) => Some(d),
            StreamEvent::Alert(_) => None,
        })
    }

    /// Iterate the alert events in order.
    pub fn alerts(&self) -> impl Iterator<Item = &AlertEvent> {
        self.events.iter().filter_map(|e| match e {
            StreamEvent::Alert(a) => Some(a),
            StreamEvent::Detection(_) => None,
        })
    }
}

impl StreamObserver for EventRecorder {
    fn on_detection(&mut self, _segment: &Segment, event: &DetectionEvent) {
        self.events.push(StreamEvent::Detection(event.clone()));
    }

    fn on_alert(&mut self, _segment: &Segment, event: &AlertEvent) {
        self.events.push(StreamEvent::Alert(*event));
    }
}

/// Outcome of streaming one segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSummary {
    pub run_id: Uuid,
    pub segment_id: String,
    pub set_name: String,
    pub label: Label,
    /// Windows the segment yields
    pub windows_total: usize,
    /// Windows actually scored before the stream ended
    pub windows_processed: usize,
    pub detections: usize,
    pub alerts: usize,
    pub score_failures: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StreamSummary {
    fn begin(segment: &Segment, windows_total: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            segment_id: segment.segment_id().to_string(),
            set_name: segment.set_name().to_string(),
            label: segment.label(),
            windows_total,
            windows_processed: 0,
            detections: 0,
            alerts: 0,
            score_failures: 0,
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }

    fn record(&mut self, detection: &DetectionEvent, alert: Option<&AlertEvent>) {
        self.windows_processed += 1;
        if detection.prediction {
            self.detections += 1;
        }
        if detection.error.is_some() {
            self.score_failures += 1;
        }
        if alert.is_some() {
            self.alerts += 1;
        }
    }

    /// Get the duration of the run in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Windowing, feature extraction, scoring and alerting for one configuration.
pub struct Pipeline<S> {
    config: Config,
    spec: WindowSpec,
    extractor: FeatureExtractor,
    alerts: AlertStateMachine,
    scorer: S,
}

impl<S: DetectionScorer> Pipeline<S> {
    /// Build a pipeline, rejecting any invalid configuration.
    pub fn new(config: Config, scorer: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let spec = WindowSpec::from_config(&config)?;
        let extractor = FeatureExtractor::from_config(&config)?;
        let alerts = AlertStateMachine::new(config.alert_threshold)?;
        Ok(Self {
            config,
            spec,
            extractor,
            alerts,
            scorer,
        })
    }

    /// Get the validated configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the window geometry.
    pub fn window_spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Get the feature extractor.
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Get the scorer.
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Pull-based event stream for one segment, without pacing.
    pub fn stream<'a>(&'a self, segment: &'a Segment) -> SegmentStream<'a, S> {
        SegmentStream {
            pipeline: self,
            windows: self.spec.windows(segment),
            machine: self.alerts.clone(),
            pending_alert: None,
        }
    }

    /// Stream a segment to an observer, pacing between windows.
    ///
    /// Cancellation is checked before each window and during each pacing
    /// suspension; a cancelled run reports how far it got.
    pub fn run<O>(
        &self,
        segment: &Segment,
        pacer: &Pacer,
        cancel: &CancelToken,
        observer: &mut O,
    ) -> StreamSummary
    where
        O: StreamObserver + ?Sized,
    {
        let mut stream = self.stream(segment);
        let mut summary = StreamSummary::begin(segment, stream.remaining());

        info!(
            segment = segment.segment_id(),
            set = segment.set_name(),
            label = %segment.label(),
            windows = summary.windows_total,
            "streaming segment"
        );
        observer.on_start(segment, summary.windows_total);

        loop {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let Some((detection, alert)) = stream.step() else {
                break;
            };

            summary.record(&detection, alert.as_ref());
            observer.on_detection(segment, &detection);
            if let Some(alert) = alert {
                observer.on_alert(segment, &alert);
            }

            if stream.remaining() > 0 && pacer.pace(cancel) == PaceOutcome::Cancelled {
                summary.cancelled = true;
                break;
            }
        }

        summary.finished_at = Utc::now();
        if summary.cancelled {
            info!(
                segment = segment.segment_id(),
                processed = summary.windows_processed,
                "stream cancelled"
            );
        }
        observer.on_finish(&summary);
        summary
    }

    fn detect(
        &self,
        window: &Window<'_>,
        machine: &mut AlertStateMachine,
    ) -> (DetectionEvent, Option<AlertEvent>) {
        let features = self.extractor.extract(window.samples);

        let (probability, prediction, error) = match checked_score(&self.scorer, &features) {
            Ok(p) => (Some(p), p >= self.config.decision_threshold, None),
            Err(e) => {
                warn!(window = window.index, error = %e, "scoring failed, treating as negative");
                (None, false, Some(e))
            }
        };

        let step = machine.observe(window.index, prediction);
        debug!(
            window = window.index,
            probability = ?probability,
            prediction,
            consecutive = step.consecutive,
            "window scored"
        );

        let detection = DetectionEvent {
            window_index: window.index,
            offset: window.offset,
            probability,
            prediction,
            consecutive: step.consecutive,
            error,
        };

        if let Some(alert) = &step.alert {
            info!(window = alert.window_index, count = alert.count, "seizure alert");
        }

        (detection, step.alert)
    }
}

/// Lazily computed events of one segment.
///
/// Each window yields its [`StreamEvent::Detection`], immediately followed by
/// a [`StreamEvent::Alert`] when that window completed a run.
pub struct SegmentStream<'a, S> {
    pipeline: &'a Pipeline<S>,
    windows: Windows<'a>,
    machine: AlertStateMachine,
    pending_alert: Option<AlertEvent>,
}

impl<S: DetectionScorer> SegmentStream<'_, S> {
    /// Score the next window.
    pub fn step(&mut self) -> Option<(DetectionEvent, Option<AlertEvent>)> {
        let window = self.windows.next()?;
        Some(self.pipeline.detect(&window, &mut self.machine))
    }

    /// Windows not yet scored.
    pub fn remaining(&self) -> usize {
        self.windows.len()
    }
}

impl<S: DetectionScorer> Iterator for SegmentStream<'_, S> {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(alert) = self.pending_alert.take() {
            return Some(StreamEvent::Alert(alert));
        }

        let (detection, alert) = self.step()?;
        self.pending_alert = alert;
        Some(StreamEvent::Detection(detection))
    }
}
