//! Error types for manifest acquisition and parsing.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;

/// Structural problems that stop one manifest (or collection) from being
/// processed at all.
///
/// Missing optional fields never produce one of these; they are logged and
/// defaulted by the parsers.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A local manifest file could not be read.
    #[error("cannot read manifest file {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A local manifest file is not valid JSON.
    #[error("manifest file {path} is not valid JSON: {source}")]
    Json {
        /// The offending file.
        path: PathBuf,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A remote manifest could not be fetched or decoded.
    #[error(transparent)]
    Fetch(#[from] DownloadError),

    /// The `@context` does not name Presentation API 2 or 3.
    #[error("unsupported IIIF version (context: {context})")]
    UnsupportedVersion {
        /// The context value that was found, or a description of its absence.
        context: String,
    },

    /// The document is neither a manifest nor a collection.
    #[error("not a manifest or a collection of manifests (type: {found})")]
    UnsupportedType {
        /// The type value that was found.
        found: String,
    },

    /// A required structural field is missing or has the wrong shape.
    #[error("'{field}' not found in manifest")]
    MissingField {
        /// The field name.
        field: &'static str,
    },

    /// An image resource has no identifier.
    #[error("image on page {page} has no id")]
    MissingImageId {
        /// 1-based page index.
        page: usize,
    },
}

impl ManifestError {
    /// Creates a file read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a file decode error.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}
