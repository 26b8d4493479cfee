//! Where a manifest comes from.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, instrument};

use super::error::ManifestError;
use crate::download::Transfer;

/// A manifest location: a remote URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// An `http` or `https` URL.
    Remote(String),
    /// A path on the local filesystem.
    Local(PathBuf),
}

impl ManifestSource {
    /// Classifies `source` by scheme; anything that is not `http(s)://` is a path.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let lower = source.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Remote(source.trim().to_string())
        } else {
            Self::Local(PathBuf::from(source))
        }
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Reads the raw JSON document behind `source`.
///
/// # Errors
///
/// Returns [`ManifestError::Fetch`] for network failures,
/// [`ManifestError::Read`] or [`ManifestError::Json`] for local files.
#[instrument(level = "debug", skip(transfer, referer), fields(source = %source))]
pub async fn acquire(
    source: &ManifestSource,
    transfer: &dyn Transfer,
    referer: Option<&str>,
) -> Result<Value, ManifestError> {
    match source {
        ManifestSource::Remote(url) => Ok(transfer.fetch_json(url, referer).await?),
        ManifestSource::Local(path) => {
            let raw = tokio::fs::read(path)
                .await
                .map_err(|e| ManifestError::read(path, e))?;
            debug!(bytes = raw.len(), "manifest file read");
            serde_json::from_slice(&raw).map_err(|e| ManifestError::json(path, e))
        }
    }
}
