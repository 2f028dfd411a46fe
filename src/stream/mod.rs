//! Replaying segments through the detection pipeline.

pub mod parallel;
pub mod session;

pub use parallel::{default_workers, StreamMessage};
pub use session::{EventRecorder, Pipeline, SegmentStream, StreamEvent, StreamObserver, StreamSummary};
