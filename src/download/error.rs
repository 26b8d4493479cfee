//! Error types for the download module.
//!
//! Every transfer attempt resolves to `Result<u64, DownloadError>`; the
//! strategy engine treats any variant as "this URI did not work" and moves on.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a document or an image.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The server's TLS certificate could not be verified.
    #[error("certificate verification failed for {url}: {reason}")]
    Certificate {
        /// The URL that failed.
        url: String,
        /// The verifier's message.
        reason: String,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the destination file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The server answered 2xx with no content.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The URL that returned nothing.
        url: String,
    },

    /// The server answered 2xx with an HTML page where a binary was expected.
    #[error("unexpected content type '{content_type}' from {url}")]
    UnexpectedContent {
        /// The URL that returned the page.
        url: String,
        /// The declared content type.
        content_type: String,
    },

    /// A JSON document could not be decoded.
    #[error("invalid JSON from {url}: {source}")]
    Json {
        /// The URL of the document.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a certificate verification error.
    pub fn certificate(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Certificate {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an empty body error.
    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Creates an unexpected content error.
    pub fn unexpected_content(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::UnexpectedContent {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates a JSON decode error.
    pub fn json(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            url: url.into(),
            source,
        }
    }

    /// Returns true when the error is a TLS certificate verification failure.
    #[must_use]
    pub fn is_certificate_error(&self) -> bool {
        matches!(self, Self::Certificate { .. })
    }
}

/// Finds a certificate verification failure in an error's source chain.
///
/// reqwest does not expose a dedicated predicate, so the chain is inspected
/// for the verifier's wording. Returns the matching message.
pub(crate) fn certificate_failure(error: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut current = Some(error);
    while let Some(err) = current {
        let text = err.to_string();
        let lower = text.to_ascii_lowercase();
        if lower.contains("certificate") || lower.contains("unknownissuer") {
            return Some(text);
        }
        current = err.source();
    }
    None
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the url
// or path, which the source errors do not carry.
