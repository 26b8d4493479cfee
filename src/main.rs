//! CLI entry point for the IIIF downloader.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use iiif_downloader_core::download::{ATTEMPT_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS};
use iiif_downloader_core::{Downloader, HttpClient, RunConfig, RunReport};
use tracing::{debug, error, info, warn};

mod app_config;
mod cli;
mod progress;

use app_config::{FileConfig, load_default_file_config};
use cli::Args;
use progress::BarProgress;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = load_default_file_config()?;
    let file_config = loaded.config.clone().unwrap_or_default();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config file > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", app_config::VerbositySetting::default_level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Log lines share stderr with the progress bar.
    let bar = BarProgress::new();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(bar.log_writer())
        .init();

    debug!(?args, "CLI arguments parsed");
    if let Some(path) = loaded.path.as_deref().filter(|_| loaded.config.is_some()) {
        debug!(path = %path.display(), "configuration file loaded");
    }

    let config = build_run_config(&args, &file_config);
    let timeout = args
        .timeout
        .or(file_config.timeout_secs)
        .unwrap_or(ATTEMPT_TIMEOUT_SECS);
    let client = HttpClient::new_with_timeouts(CONNECT_TIMEOUT_SECS, timeout);

    let mut downloader = Downloader::new(client, config).context("Invalid configuration")?;
    if !args.quiet {
        downloader = downloader.with_observer(Arc::new(bar));
    }

    let cancel = downloader.cancellation_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current page");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    info!(source = %downloader.config().source, "IIIF downloader starting");
    let report = match downloader.run().await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "download failed");
            return Ok(ExitCode::FAILURE);
        }
    };

    Ok(exit_code(&report))
}

/// Merges command-line values over file defaults.
fn build_run_config(args: &Args, file: &FileConfig) -> RunConfig {
    let output_dir = args
        .directory
        .clone()
        .or_else(|| file.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = RunConfig::new(args.manifest.clone(), output_dir);
    config.pages = args.pages;
    config.overwrite = args.force;
    config.use_labels_as_filenames = args.use_labels || file.use_labels.unwrap_or(false);
    config.download_all_candidates_per_page = args.all_images;
    config.fixed_width = args.width;
    config.referer = args.referer.clone().or_else(|| file.referer.clone());
    config.query_image_info = args.image_info || file.image_info.unwrap_or(false);
    config
}

fn exit_code(report: &RunReport) -> ExitCode {
    for failure in &report.failures {
        error!(source = %failure.source, reason = %failure.reason, "manifest not processed");
    }
    for manifest in report.manifests.iter().filter(|m| m.stats.has_failures()) {
        error!(
            title = %manifest.label,
            failed = manifest.stats.failed,
            "manifest incomplete"
        );
    }
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
