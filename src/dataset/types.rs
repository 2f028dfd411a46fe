//! Recording types shared by the loader, the windowing engine and the stream.

use serde::{Deserialize, Serialize};

/// Binary ground-truth label of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Label {
    /// Non-event recording
    Normal,
    /// Ictal (seizure) recording
    Seizure,
}

impl Label {
    /// Check if this is the seizure class.
    pub fn is_seizure(self) -> bool {
        self == Label::Seizure
    }

    /// Get the display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Seizure => "SEIZURE",
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        match label {
            Label::Normal => 0,
            Label::Seizure => 1,
        }
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Normal),
            1 => Ok(Label::Seizure),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-channel recording with its metadata.
///
/// Segments are immutable once built; windows borrow from the signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    signal: Vec<f64>,
    label: Label,
    set_name: String,
    segment_id: String,
}

impl Segment {
    /// Create a new segment.
    pub fn new(
        signal: Vec<f64>,
        label: Label,
        set_name: impl Into<String>,
        segment_id: impl Into<String>,
    ) -> Self {
        Self {
            signal,
            label,
            set_name: set_name.into(),
            segment_id: segment_id.into(),
        }
    }

    /// Get the raw samples.
    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    /// Get the ground-truth label.
    pub fn label(&self) -> Label {
        self.label
    }

    /// Get the source set name.
    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    /// Get the segment identifier (the file stem).
    pub fn segment_id(&self) -> &str {
        &self.segment_id
    }

    /// Number of samples in the signal.
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }
}
