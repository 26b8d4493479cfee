//! Per-manifest download statistics.

use std::ops::AddAssign;
use std::time::Duration;

/// Counts and totals for one manifest, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub total_bytes: u64,
}

impl RunStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_download(&mut self, bytes: u64) {
        self.downloaded += 1;
        self.total_bytes += bytes;
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Pages seen, whatever their outcome.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    /// Whether any page failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Mean wall time per downloaded file.
    #[must_use]
    pub fn avg_time_per_file(&self) -> Option<Duration> {
        let count = u32::try_from(self.downloaded).ok().filter(|n| *n > 0)?;
        Some(self.elapsed / count)
    }

    /// Mean size of a downloaded file, in bytes.
    #[must_use]
    pub fn avg_bytes_per_file(&self) -> Option<u64> {
        let count = u64::try_from(self.downloaded).ok().filter(|n| *n > 0)?;
        Some(self.total_bytes / count)
    }
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.elapsed += other.elapsed;
        self.total_bytes += other.total_bytes;
    }
}
