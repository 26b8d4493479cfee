//! What a run produced.

use std::path::PathBuf;

use super::stats::RunStats;

/// Result of one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReport {
    /// Where the manifest was read from.
    pub source: String,
    pub label: String,
    /// Final output directory (`ERR_`-prefixed when pages failed), or
    /// `None` when the manifest had no pages.
    pub dir: Option<PathBuf>,
    pub stats: RunStats,
    /// The run was cancelled before every selected page was processed.
    pub cancelled: bool,
}

/// A collection member that could not be processed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFailure {
    pub source: String,
    pub reason: String,
}

/// Result of a run over a manifest or a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Manifests processed, in collection order.
    pub manifests: Vec<ManifestReport>,
    /// Collection members that failed structurally.
    pub failures: Vec<MemberFailure>,
}

impl RunReport {
    /// Statistics summed over every manifest.
    #[must_use]
    pub fn totals(&self) -> RunStats {
        let mut totals = RunStats::new();
        for manifest in &self.manifests {
            totals += manifest.stats;
        }
        totals
    }

    /// Whether every manifest was processed and no page failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.manifests.iter().all(|m| !m.stats.has_failures())
    }
}
