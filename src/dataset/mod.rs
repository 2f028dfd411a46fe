//! Recording ingestion for the seizure stream.
//!
//! This module provides the segment types and the helpers that read a
//! directory of recordings and partition it by source set.

pub mod loader;
pub mod split;
pub mod types;

// Re-export commonly used types
pub use loader::{load_dataset, load_segment, DatasetError};
pub use split::stratified_split;
pub use types::{Label, Segment};
