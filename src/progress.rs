//! Progress bar for download runs.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use iiif_downloader_core::{PageOutcome, PageProgress, ProgressObserver, RunStats};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::fmt::MakeWriter;

type SharedBar = Arc<Mutex<Option<ProgressBar>>>;

/// Renders one bar per manifest on stderr.
///
/// Log lines go through [`BarProgress::log_writer`], which hides the bar
/// while a line is written, so the bar only carries the page counter and the
/// current label.
pub(crate) struct BarProgress {
    bar: SharedBar,
}

impl BarProgress {
    pub(crate) fn new() -> Self {
        Self {
            bar: Arc::new(Mutex::new(None)),
        }
    }

    /// Writer for the tracing subscriber that prints above the active bar.
    pub(crate) fn log_writer(&self) -> BarLogWriter {
        BarLogWriter {
            bar: Arc::clone(&self.bar),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }
}

impl ProgressObserver for BarProgress {
    fn manifest_started(&self, label: &str, pages: usize) {
        let bar = ProgressBar::new(pages as u64);
        bar.set_style(
            ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(label.chars().take(40).collect::<String>());
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn page_started(&self, progress: &PageProgress) {
        self.with_bar(|bar| bar.set_message(progress.label.clone()));
    }

    fn page_finished(&self, _progress: &PageProgress, outcome: &PageOutcome) {
        self.with_bar(|bar| {
            if let PageOutcome::Failed { reason } = outcome {
                bar.println(format!("page failed: {reason}"));
            }
            bar.inc(1);
        });
    }

    fn manifest_finished(&self, _label: &str, dir: &Path, stats: &RunStats) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_with_message(format!(
                "{} downloaded, {} skipped, {} failed -> {}",
                stats.downloaded,
                stats.skipped,
                stats.failed,
                dir.display()
            ));
        }
    }
}

/// [`MakeWriter`] that writes to stderr around the active progress bar.
#[derive(Clone)]
pub(crate) struct BarLogWriter {
    bar: SharedBar,
}

impl BarLogWriter {
    fn active_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Write for BarLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.active_bar() {
            Some(bar) => bar.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for BarLogWriter {
    type Writer = BarLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
