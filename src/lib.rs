//! IIIF Downloader Core Library
//!
//! Downloads every page image of a IIIF Presentation API manifest (or of
//! each manifest in a collection) into a directory per manifest.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`manifest`] - Acquisition, version detection and v2/v3 parsing
//! - [`image_api`] - Image API request URIs, formats and `info.json`
//! - [`download`] - HTTP transfer with streaming and TLS fallback
//! - [`strategy`] - Adaptive per-page image URI resolution
//! - [`run`] - Page loop, statistics, progress events and collections

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod image_api;
pub mod manifest;
pub mod run;
pub mod strategy;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use download::{DownloadError, HttpClient, Transfer};
pub use manifest::{IiifVersion, ImageCandidate, Manifest, ManifestError, Page, parse_manifest};
pub use run::{
    ConfigError, Downloader, PageOutcome, PageProgress, PageRange, ProgressObserver, RunConfig,
    RunError, RunReport, RunStats, parse_range,
};
pub use strategy::{StrategyState, Tier};
pub use user_agent::BROWSER_USER_AGENT;
