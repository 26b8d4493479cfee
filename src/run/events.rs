//! Progress events emitted while a run is in flight.

use std::path::Path;

use super::stats::RunStats;
use crate::strategy::Tier;

/// Where a page stands when it is picked up.
#[derive(Debug, Clone, PartialEq)]
pub struct PageProgress {
    /// 1-based page number within the manifest.
    pub index: usize,
    /// Page count of the whole manifest.
    pub total: usize,
    /// Share of the selected range reached with this page, 0-100.
    pub percent: f64,
    pub label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// What happened to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// At least one image was saved; `uri` and `tier` are those of the last.
    Downloaded { uri: String, bytes: u64, tier: Tier },
    /// Nothing to do: no image, or the file already exists.
    Skipped { reason: String },
    /// No image could be saved.
    Failed { reason: String },
}

/// Receives progress notifications. Every method defaults to doing nothing.
pub trait ProgressObserver: Send + Sync {
    /// A manifest is about to be processed.
    fn manifest_started(&self, _label: &str, _pages: usize) {}

    /// A page is about to be processed.
    fn page_started(&self, _progress: &PageProgress) {}

    /// A page has been processed.
    fn page_finished(&self, _progress: &PageProgress, _outcome: &PageOutcome) {}

    /// A manifest has been processed; `dir` is its final directory.
    fn manifest_finished(&self, _label: &str, _dir: &Path, _stats: &RunStats) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}
