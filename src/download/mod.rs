//! File transfer: one HTTP(S) fetch per call, saved to disk or decoded as JSON.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large TIFF/JP2 pages)
//! - Browser User-Agent and optional Referer on every request
//! - One retry with certificate verification disabled after a TLS failure
//! - Partial output removed on any failure
//! - Page file and manifest directory naming
//!
//! # Example
//!
//! ```no_run
//! use iiif_downloader_core::download::{HttpClient, Transfer};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let bytes = client
//!     .fetch_to_file(
//!         "https://example.org/iiif/p1/full/max/0/default.jpg",
//!         Path::new("./p001.jpg"),
//!         None,
//!     )
//!     .await?;
//! println!("saved {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
pub mod filename;

pub use client::{HttpClient, Transfer};
pub use constants::{ATTEMPT_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS};
pub use error::DownloadError;
pub use filename::{PageNaming, page_filename, sanitize_name};
