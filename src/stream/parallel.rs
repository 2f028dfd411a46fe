//! Streaming several segments at once.
//!
//! Every segment runs on a worker thread with its own alert state. Workers
//! forward their events over a channel to the caller, so events of one
//! segment arrive in causal order while segments interleave freely.

use crate::core::alert::{AlertEvent, DetectionEvent};
use crate::core::pacer::{CancelToken, Pacer};
use crate::core::scorer::DetectionScorer;
use crate::dataset::types::Segment;
use crate::stream::session::{Pipeline, StreamEvent, StreamObserver, StreamSummary};
use crossbeam_channel::{unbounded, Sender};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::debug;

/// Message forwarded from a segment worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum StreamMessage {
    Started { segment_id: String, windows: usize },
    Event { segment_id: String, event: StreamEvent },
    Finished(StreamSummary),
}

/// Observer that forwards everything to a channel.
struct ChannelObserver {
    sender: Sender<StreamMessage>,
}

impl ChannelObserver {
    fn send(&self, message: StreamMessage) {
        // The receiver only disappears once the caller stops listening.
        let _ = self.sender.send(message);
    }
}

impl StreamObserver for ChannelObserver {
    fn on_start(&mut self, segment: &Segment, windows: usize) {
        self.send(StreamMessage::Started {
            segment_id: segment.segment_id().to_string(),
            windows,
        });
    }

    fn on_detection(&mut self, segment: &Segment, event: &DetectionEvent) {
        self.send(StreamMessage::Event {
            segment_id: segment.segment_id().to_string(),
            event: StreamEvent::Detection(event.clone()),
        });
    }

    fn on_alert(&mut self, segment: &Segment, event: &AlertEvent) {
        self.send(StreamMessage::Event {
            segment_id: segment.segment_id().to_string(),
            event: StreamEvent::Alert(*event),
        });
    }

    fn on_finish(&mut self, summary: &StreamSummary) {
        self.send(StreamMessage::Finished(summary.clone()));
    }
}

/// Default worker count: one per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl<S: DetectionScorer> Pipeline<S> {
    /// Stream `segments` on up to `workers` threads, handing every message
    /// to `on_message` on the calling thread.
    ///
    /// Returns the summaries in input order.
    pub fn run_parallel<F>(
        &self,
        segments: &[Segment],
        workers: usize,
        pacer: &Pacer,
        cancel: &CancelToken,
        mut on_message: F,
    ) -> Vec<StreamSummary>
    where
        F: FnMut(StreamMessage),
    {
        let workers = workers.clamp(1, segments.len().max(1));
        let (job_tx, job_rx) = unbounded::<usize>();
        for i in 0..segments.len() {
            // Unbounded and the receiver is alive: cannot fail.
            let _ = job_tx.send(i);
        }
        drop(job_tx);

        let (msg_tx, msg_rx) = unbounded::<StreamMessage>();

        let mut summaries: Vec<(usize, StreamSummary)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let job_rx = job_rx.clone();
                    let mut observer = ChannelObserver {
                        sender: msg_tx.clone(),
                    };
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        for i in job_rx.iter() {
                            let segment = &segments[i];
                            debug!(worker, segment = segment.segment_id(), "worker picked segment");
                            done.push((i, self.run(segment, pacer, cancel, &mut observer)));
                        }
                        done
                    })
                })
                .collect();
            drop(msg_tx);

            for message in msg_rx.iter() {
                on_message(message);
            }

            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(done) => done,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        summaries.sort_by_key(|(i, _)| *i);
        summaries.into_iter().map(|(_, s)| s).collect()
    }
}
