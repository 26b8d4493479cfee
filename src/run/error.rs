use std::path::PathBuf;

use thiserror::Error;

use super::config::ConfigError;
use crate::manifest::ManifestError;

/// Errors that stop a manifest (or the whole run) from being processed.
///
/// Page-level failures are never reported this way; they are counted in
/// [`RunStats`](super::RunStats) instead.
#[derive(Debug, Error)]
pub enum RunError {
    /// The configuration was rejected before anything ran.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The document could not be acquired or understood.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The output directory could not be prepared or finalized.
    #[error("output directory error at {path}: {source}")]
    Io {
        /// The directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// Creates an output directory error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
