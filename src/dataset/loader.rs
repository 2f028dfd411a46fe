//! Loading segments from a directory of plain-text recordings.
//!
//! The expected layout is one sub-directory per source set, each holding one
//! `.txt` (or `.TXT`) file per segment with a single sample per line.

use crate::config::SetLabels;
use crate::dataset::types::Segment;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Errors raised while reading recordings.
#[derive(Debug)]
pub enum DatasetError {
    Io { path: PathBuf, message: String },
    Empty(PathBuf),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Io { path, message } => write!(f, "IO error reading {path:?}: {message}"),
            DatasetError::Empty(path) => write!(f, "No segments found under {path:?}"),
        }
    }
}

impl std::error::Error for DatasetError {}

/// Read a single recording. Lines that are not numbers are skipped.
pub fn load_segment(path: &Path) -> Result<Vec<f64>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|e| DatasetError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(parse_samples(&content))
}

fn parse_samples(content: &str) -> Vec<f64> {
    content
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .collect()
}

/// Load every segment of every labelled source set under `data_dir`.
///
/// Sets are visited in name order; within a set, `.txt` files come first,
/// then `.TXT`, each sorted by path. Missing set directories are skipped.
pub fn load_dataset(data_dir: &Path, set_labels: &SetLabels) -> Result<Vec<Segment>, DatasetError> {
    let mut dataset = Vec::new();

    for (set_name, label) in set_labels.iter() {
        let set_dir = data_dir.join(set_name);
        if !set_dir.is_dir() {
            warn!("{set_dir:?} not found, skipping");
            continue;
        }

        for path in segment_files(&set_dir)? {
            let signal = load_segment(&path)?;
            let segment_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            debug!(set = set_name, %segment_id, samples = signal.len(), "loaded segment");
            dataset.push(Segment::new(signal, label, set_name, segment_id));
        }
    }

    if dataset.is_empty() {
        return Err(DatasetError::Empty(data_dir.to_path_buf()));
    }

    info!(segments = dataset.len(), "dataset loaded");
    Ok(dataset)
}

fn segment_files(set_dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let entries: Vec<PathBuf> = std::fs::read_dir(set_dir)
        .map_err(|e| DatasetError::Io {
            path: set_dir.to_path_buf(),
            message: e.to_string(),
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();

    let with_extension = |ext: &str| {
        let mut files: Vec<PathBuf> = entries
            .iter()
            .filter(|p| p.extension().map(|e| e == ext).unwrap_or(false))
            .cloned()
            .collect();
        files.sort();
        files
    };

    let mut files = with_extension("txt");
    files.extend(with_extension("TXT"));
    Ok(files)
}
