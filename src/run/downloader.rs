//! Runs manifests and collections page by page.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::config::{ConfigError, RunConfig};
use super::error::RunError;
use super::events::{NoProgress, PageOutcome, PageProgress, ProgressObserver};
use super::report::{ManifestReport, MemberFailure, RunReport};
use super::stats::RunStats;
use crate::download::Transfer;
use crate::download::filename::{PageNaming, error_dir_name, page_filename, sanitize_name};
use crate::manifest::{
    DocumentKind, IiifVersion, Manifest, ManifestSource, Page, ParseOptions, UNTITLED_LABEL,
    acquire, collection_members, detect_kind, detect_version, parse_manifest,
};
use crate::strategy::{PageRequest, Resolution, StrategyState, Tier, resolve_page};

/// Collections may nest; deeper members are reported as failures.
const MAX_COLLECTION_DEPTH: usize = 4;

/// Downloads every selected page of a manifest, or of each manifest of a
/// collection, into the configured output directory.
///
/// Pages are processed strictly one after another. Strategy flags live for
/// one manifest only.
pub struct Downloader<T: Transfer> {
    transfer: T,
    config: RunConfig,
    observer: Arc<dyn ProgressObserver>,
    cancelled: Arc<AtomicBool>,
    /// Directory names already given to a manifest during this run.
    claimed_dirs: Mutex<HashSet<String>>,
}

/// Mutable state of one manifest while its pages run.
struct ManifestRun<'a> {
    dir: &'a Path,
    version: IiifVersion,
    state: StrategyState,
    /// No page has reached the strategy engine yet.
    first_page_pending: bool,
    /// Sanitized canvas labels used by more than one page.
    repeated_labels: HashSet<String>,
}

impl<T: Transfer> Downloader<T> {
    /// Creates a downloader for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when [`RunConfig::validate`] fails.
    pub fn new(transfer: T, config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transfer,
            config,
            observer: Arc::new(NoProgress),
            cancelled: Arc::new(AtomicBool::new(false)),
            claimed_dirs: Mutex::new(HashSet::new()),
        })
    }

    /// Replaces the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Flag that stops the run before the next page once set.
    #[must_use]
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Processes the configured source.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] when the source document cannot be acquired or
    /// understood, or a single manifest fails structurally. Failures of
    /// collection members are recorded in the report instead.
    #[instrument(skip(self), fields(source = %self.config.source))]
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let source = ManifestSource::parse(&self.config.source);
        let doc = acquire(&source, &self.transfer, self.config.referer.as_deref()).await?;

        let mut report = RunReport::default();
        self.process_document(&source.to_string(), &doc, 0, &mut report)
            .await?;

        let totals = report.totals();
        info!(
            manifests = report.manifests.len(),
            member_failures = report.failures.len(),
            downloaded = totals.downloaded,
            skipped = totals.skipped,
            failed = totals.failed,
            "run finished"
        );
        Ok(report)
    }

    async fn process_document(
        &self,
        origin: &str,
        doc: &Value,
        depth: usize,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        let version = detect_version(doc)?;
        match detect_kind(doc, version)? {
            DocumentKind::Manifest => {
                let options = ParseOptions {
                    all_candidates: self.config.download_all_candidates_per_page,
                };
                let manifest = parse_manifest(doc, &options)?;
                let manifest_report = self.run_manifest(origin, &manifest).await?;
                report.manifests.push(manifest_report);
            }
            DocumentKind::Collection => {
                let members = collection_members(doc, version)?;
                info!(origin, members = members.len(), "collection read");
                for member in members {
                    if self.is_cancelled() {
                        warn!("run cancelled, remaining collection members not processed");
                        break;
                    }
                    if depth + 1 > MAX_COLLECTION_DEPTH {
                        warn!(member = %member, "collection nested too deeply, skipping member");
                        report.failures.push(MemberFailure {
                            source: member,
                            reason: "collection nested too deeply".to_string(),
                        });
                        continue;
                    }
                    if let Err(e) = self.process_member(&member, depth + 1, report).await {
                        error!(member = %member, error = %e, "collection member failed");
                        report.failures.push(MemberFailure {
                            source: member,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    async fn process_member(
        &self,
        member: &str,
        depth: usize,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        let source = ManifestSource::parse(member);
        let doc = acquire(&source, &self.transfer, self.config.referer.as_deref()).await?;
        Box::pin(self.process_document(member, &doc, depth, report)).await
    }

    /// Downloads the selected pages of one parsed manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] when the output directory cannot be created
    /// or renamed. Page failures are counted, not returned.
    #[instrument(skip(self, manifest), fields(title = %manifest.label))]
    pub async fn run_manifest(
        &self,
        source: &str,
        manifest: &Manifest,
    ) -> Result<ManifestReport, RunError> {
        let total = manifest.pages.len();
        let mut stats = RunStats::new();
        let mut report = ManifestReport {
            source: source.to_string(),
            label: manifest.label.clone(),
            dir: None,
            stats,
            cancelled: false,
        };
        if total == 0 {
            info!("manifest has no pages, nothing to download");
            return Ok(report);
        }

        let dir_name = self.claim_dir_name(manifest_dir_name(&manifest.label));
        let dir = self.config.output_dir.join(&dir_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| RunError::io(&dir, e))?;
        debug!(dir = %dir.display(), "output directory ready");

        let (start, end) = self.config.pages.bounds(total);
        if !self.config.pages.is_all() {
            info!(
                range = %self.config.pages,
                selected = end - start,
                total,
                "downloading page range"
            );
        }
        self.observer.manifest_started(&manifest.label, end - start);

        let mut run = ManifestRun {
            dir: &dir,
            version: manifest.version,
            state: match self.config.fixed_width {
                Some(_) => StrategyState::with_fixed_width(),
                None => StrategyState::new(),
            },
            first_page_pending: true,
            repeated_labels: if self.config.use_labels_as_filenames {
                repeated_labels(&manifest.pages)
            } else {
                HashSet::new()
            },
        };

        let started = Instant::now();
        for (offset, page) in manifest.pages[start..end].iter().enumerate() {
            if self.is_cancelled() {
                warn!(remaining = end - start - offset, "run cancelled");
                report.cancelled = true;
                break;
            }

            let index = start + offset + 1;
            let (width, height) = page_dimensions(page, self.config.fixed_width);
            let progress = PageProgress {
                index,
                total,
                percent: percent(offset + 1, end - start),
                label: page.label.clone(),
                width,
                height,
            };
            info!(
                page = index,
                total,
                percent = progress.percent,
                label = %page.label,
                width = ?width,
                height = ?height,
                "page"
            );
            self.observer.page_started(&progress);

            let outcome = self.process_page(&mut run, index, page, width).await;
            match &outcome {
                PageOutcome::Downloaded { bytes, .. } => stats.record_download(*bytes),
                PageOutcome::Skipped { .. } => stats.record_skip(),
                PageOutcome::Failed { .. } => stats.record_failure(),
            }
            self.observer.page_finished(&progress, &outcome);
        }
        stats.elapsed = started.elapsed();
        log_stats(&stats);

        let final_dir = if stats.has_failures() {
            self.mark_failed(&dir, &dir_name).await?
        } else {
            dir.clone()
        };
        self.observer
            .manifest_finished(&manifest.label, &final_dir, &stats);

        report.dir = Some(final_dir);
        report.stats = stats;
        Ok(report)
    }

    async fn process_page(
        &self,
        run: &mut ManifestRun<'_>,
        index: usize,
        page: &Page,
        width: Option<u32>,
    ) -> PageOutcome {
        if let Some(defect) = &page.defect {
            error!(page = index, defect = %defect, "page cannot be downloaded");
            return PageOutcome::Failed {
                reason: defect.clone(),
            };
        }
        if page.candidates.is_empty() {
            info!(page = index, "no image on this page, skipping");
            return PageOutcome::Skipped {
                reason: "no image".to_string(),
            };
        }

        let keep = if self.config.download_all_candidates_per_page {
            page.candidates.len()
        } else {
            1
        };
        let candidates = &page.candidates[..keep];
        let numbered = candidates.len() > 1;
        let naming = if self.config.use_labels_as_filenames {
            if run.repeated_labels.contains(&sanitize_name(&page.label)) {
                PageNaming::LabelWithIndex
            } else {
                PageNaming::Label
            }
        } else {
            PageNaming::Numbered
        };

        let mut saved: Option<(String, Tier)> = None;
        let mut bytes_total = 0;
        let mut failure: Option<String> = None;
        let mut engine_ran = false;

        for (n, candidate) in candidates.iter().enumerate() {
            let filename = page_filename(
                index,
                &page.label,
                &candidate.extension,
                naming,
                numbered.then_some(n + 1),
            );
            let dest = run.dir.join(&filename);
            if !self.config.overwrite && tokio::fs::try_exists(&dest).await.unwrap_or(false) {
                debug!(file = %dest.display(), "exists, skip");
                continue;
            }

            engine_ran = true;
            info!(page = index, id = %candidate.id, extension = %candidate.extension, "resolving");
            let request = PageRequest {
                candidate,
                width,
                version: run.version,
                dest: &dest,
                referer: self.config.referer.as_deref(),
                first_page: run.first_page_pending,
                query_image_info: self.config.query_image_info,
            };
            match resolve_page(&self.transfer, &request, &mut run.state).await {
                Resolution::Downloaded { uri, bytes, tier } => {
                    info!(
                        file = %filename,
                        kb = bytes / 1000,
                        dir = %run.dir.display(),
                        "saved"
                    );
                    bytes_total += bytes;
                    saved = Some((uri, tier));
                }
                Resolution::Exhausted {
                    attempts,
                    last_error,
                } => {
                    error!(
                        page = index,
                        id = %candidate.id,
                        attempts,
                        last_error = ?last_error,
                        "no working URI for image"
                    );
                    failure = Some(last_error.unwrap_or_else(|| "no applicable URI".to_string()));
                }
            }
        }
        if engine_ran {
            run.first_page_pending = false;
        }

        match (failure, saved) {
            (Some(reason), _) => PageOutcome::Failed { reason },
            (None, Some((uri, tier))) => PageOutcome::Downloaded {
                uri,
                bytes: bytes_total,
                tier,
            },
            (None, None) => PageOutcome::Skipped {
                reason: "file exists".to_string(),
            },
        }
    }

    /// Reserves `base` for one manifest of this run. A label already used by
    /// an earlier manifest gets `_2`, `_3`, ... in processing order, so a
    /// re-run maps every manifest to the same directory again.
    fn claim_dir_name(&self, base: String) -> String {
        let mut claimed = self
            .claimed_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if claimed.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if claimed.insert(candidate.clone()) {
                warn!(label = %base, dir = %candidate, "directory name already used in this run");
                return candidate;
            }
            n += 1;
        }
    }

    /// Renames `dir` with the error prefix, replacing any stale one.
    async fn mark_failed(&self, dir: &Path, dir_name: &str) -> Result<PathBuf, RunError> {
        let err_dir = self.config.output_dir.join(error_dir_name(dir_name));
        if tokio::fs::try_exists(&err_dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&err_dir)
                .await
                .map_err(|e| RunError::io(&err_dir, e))?;
        }
        tokio::fs::rename(dir, &err_dir)
            .await
            .map_err(|e| RunError::io(dir, e))?;
        error!(dir = %err_dir.display(), "some pages failed, directory renamed");
        Ok(err_dir)
    }
}

fn manifest_dir_name(label: &str) -> String {
    let name = sanitize_name(label);
    if name.is_empty() {
        UNTITLED_LABEL.to_string()
    } else {
        name
    }
}

/// Sanitized labels shared by several pages; empty labels fall back to
/// numbered names anyway.
fn repeated_labels(pages: &[Page]) -> HashSet<String> {
    let mut seen = HashSet::new();
    pages
        .iter()
        .map(|page| sanitize_name(&page.label))
        .filter(|label| !label.is_empty() && !seen.insert(label.clone()))
        .collect()
}

/// Applies a fixed width, scaling the declared height to keep the ratio.
fn page_dimensions(page: &Page, fixed_width: Option<u32>) -> (Option<u32>, Option<u32>) {
    let Some(fixed) = fixed_width else {
        return (page.width, page.height);
    };
    let height = match (page.width, page.height) {
        (Some(w), Some(h)) if w > 0 => {
            let scaled = (u64::from(h) * u64::from(fixed) + u64::from(w) / 2) / u64::from(w);
            u32::try_from(scaled).ok()
        }
        (_, h) => h,
    };
    (Some(fixed), height)
}

#[allow(clippy::cast_precision_loss)]
fn percent(done: usize, of: usize) -> f64 {
    if of == 0 {
        return 100.0;
    }
    (done as f64 / of as f64 * 1000.0).round() / 10.0
}

fn log_stats(stats: &RunStats) {
    info!(
        downloaded = stats.downloaded,
        skipped = stats.skipped,
        failed = stats.failed,
        elapsed_secs = stats.elapsed.as_secs_f64(),
        avg_secs_per_file = stats.avg_time_per_file().map(|d| d.as_secs_f64()),
        total_kb = stats.total_bytes / 1000,
        avg_kb_per_file = stats.avg_bytes_per_file().map(|b| b / 1000),
        "manifest finished"
    );
}
