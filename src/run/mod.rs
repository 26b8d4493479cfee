//! Run orchestration: configuration, the page loop, statistics and progress.
//!
//! # Example
//!
//! ```no_run
//! use iiif_downloader_core::download::HttpClient;
//! use iiif_downloader_core::run::{Downloader, RunConfig, parse_range};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = RunConfig::new("https://example.org/iiif/book/manifest", "./downloads");
//! config.pages = parse_range("1-10")?;
//!
//! let downloader = Downloader::new(HttpClient::new(), config)?;
//! let report = downloader.run().await?;
//! println!("{} pages downloaded", report.totals().downloaded);
//! # Ok(())
//! # }
//! ```

mod config;
mod downloader;
mod error;
mod events;
mod report;
mod stats;

pub use config::{ConfigError, PageRange, RunConfig, parse_range};
pub use downloader::Downloader;
pub use error::RunError;
pub use events::{NoProgress, PageOutcome, PageProgress, ProgressObserver};
pub use report::{ManifestReport, MemberFailure, RunReport};
pub use stats::RunStats;
