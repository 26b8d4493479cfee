//! IIIF Presentation API documents: acquisition, version detection and
//! parsing into one canonical page model.
//!
//! Version 2 and version 3 manifests describe the same thing with
//! incompatible schemas. Each has its own parser; both produce a
//! [`Manifest`] whose pages are in canvas order.
//!
//! # Example
//!
//! ```
//! use iiif_downloader_core::manifest::{ParseOptions, parse_manifest};
//!
//! let doc = serde_json::json!({
//!     "@context": "http://iiif.io/api/presentation/2/context.json",
//!     "@id": "https://example.org/iiif/book/manifest",
//!     "@type": "sc:Manifest",
//!     "label": "Book",
//!     "sequences": [{"canvases": [{
//!         "label": "1r", "width": 1000, "height": 1500,
//!         "images": [{"resource": {"@id": "https://example.org/img/1.jpg", "format": "image/jpeg"}}]
//!     }]}]
//! });
//! let manifest = parse_manifest(&doc, &ParseOptions::default()).unwrap();
//! assert_eq!(manifest.pages.len(), 1);
//! assert_eq!(manifest.pages[0].candidates[0].extension, "jpg");
//! ```

mod error;
mod fields;
mod label;
mod source;
mod v2;
mod v3;
mod version;

pub use error::ManifestError;
pub use label::resolve_label;
pub use source::{ManifestSource, acquire};
pub use version::{DocumentKind, IiifVersion, collection_members, detect_kind, detect_version};

use serde_json::Value;
use tracing::{debug, info};

use crate::image_api::resolve_extension;

/// Label given to a manifest that declares none.
pub const UNTITLED_LABEL: &str = "untitled";

/// One paginated work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub id: String,
    pub label: String,
    pub version: IiifVersion,
    /// Pages in canvas order; page `n` (1-based) is `pages[n - 1]`.
    pub pages: Vec<Page>,
}

/// One canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Images painted on the canvas, possibly none.
    pub candidates: Vec<ImageCandidate>,
    /// Set when the canvas could not be interpreted; the page counts as
    /// failed but the rest of the manifest is still processed.
    pub defect: Option<String>,
}

impl Page {
    pub(crate) fn new(label: String, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            label,
            width,
            height,
            candidates: Vec::new(),
            defect: None,
        }
    }
}

/// One image that may be downloaded for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Image identifier, usually a URI.
    pub id: String,
    /// Declared MIME type, if any.
    pub format: Option<String>,
    /// File extension without the dot.
    pub extension: String,
    /// Base URI of an Image API service for this image.
    pub service_id: Option<String>,
}

impl ImageCandidate {
    /// Creates a candidate, deriving its extension from format and id.
    #[must_use]
    pub fn new(id: String, format: Option<String>, service_id: Option<String>) -> Self {
        let extension = resolve_extension(format.as_deref(), &id);
        Self {
            id,
            format,
            extension,
            service_id,
        }
    }
}

/// Parser switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Keep every image of a canvas instead of only the first.
    pub all_candidates: bool,
}

/// Detects the version of `doc` and parses it with the matching parser.
///
/// # Errors
///
/// Returns a [`ManifestError`] for an unsupported version or a structural
/// problem (missing canvas list, missing image id).
pub fn parse_manifest(doc: &Value, options: &ParseOptions) -> Result<Manifest, ManifestError> {
    let version = detect_version(doc)?;
    let manifest = match version {
        IiifVersion::V2 => v2::parse(doc, options)?,
        IiifVersion::V3 => v3::parse(doc, options)?,
    };

    debug!(api = %manifest.version, id = %manifest.id, "manifest parsed");
    info!(title = %manifest.label, files = manifest.pages.len(), "manifest read");
    Ok(manifest)
}
