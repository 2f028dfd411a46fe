//! Sliding-window segmentation of recordings.
//!
//! Windows are fixed-length views into a segment's signal taken at offsets
//! `0, step, 2*step, ...` for as long as a full window fits. A trailing
//! remainder shorter than the window is never padded or emitted.

use crate::config::{Config, ConfigError};
use crate::dataset::types::{Label, Segment};
use std::iter::FusedIterator;

/// Window geometry shared by every segment a pipeline processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    length: usize,
    step: usize,
}

impl WindowSpec {
    /// Create a window geometry. Both values must be positive.
    pub fn new(length: usize, step: usize) -> Result<Self, ConfigError> {
        if length == 0 {
            return Err(ConfigError::Invalid("window_length must be positive".into()));
        }
        if step == 0 {
            return Err(ConfigError::Invalid("step_size must be positive".into()));
        }
        Ok(Self { length, step })
    }

    /// Create a window geometry from the config.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config.window_length, config.step_size)
    }

    /// Get the window length in samples.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Get the step between window starts in samples.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of windows a signal of `n` samples yields.
    pub fn window_count(&self, n: usize) -> usize {
        if n < self.length {
            0
        } else {
            (n - self.length) / self.step + 1
        }
    }

    /// Iterate the windows of a segment, each paired with the segment's label.
    ///
    /// Calling this again restarts from offset zero.
    pub fn windows<'a>(&self, segment: &'a Segment) -> Windows<'a> {
        Windows::new(segment.signal(), segment.label(), *self)
    }
}

/// A fixed-length view into a segment's signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    /// Position of the window in the sequence (0-based)
    pub index: usize,
    /// Sample offset of the first sample
    pub offset: usize,
    /// The window's samples
    pub samples: &'a [f64],
    /// Label inherited from the segment
    pub label: Label,
}

/// Cursor over the windows of one signal.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    signal: &'a [f64],
    label: Label,
    spec: WindowSpec,
    next_offset: usize,
    next_index: usize,
}

impl<'a> Windows<'a> {
    fn new(signal: &'a [f64], label: Label, spec: WindowSpec) -> Self {
        Self {
            signal,
            label,
            spec,
            next_offset: 0,
            next_index: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.spec
            .window_count(self.signal.len())
            .saturating_sub(self.next_index)
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.next_offset.checked_add(self.spec.length)?;
        if end > self.signal.len() {
            return None;
        }

        let window = Window {
            index: self.next_index,
            offset: self.next_offset,
            samples: &self.signal[self.next_offset..end],
            label: self.label,
        };

        // Saturate so an exhausted cursor stays exhausted.
        self.next_offset = self.next_offset.saturating_add(self.spec.step);
        self.next_index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows<'_> {}

impl FusedIterator for Windows<'_> {}
