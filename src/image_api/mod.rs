//! Image API helpers: file extensions, canonical request URIs and the
//! image-information document.
//!
//! # Example
//!
//! ```
//! use iiif_downloader_core::image_api::{ImageRequest, SizeParam};
//!
//! let request = ImageRequest::full_image("https://example.org/iiif/p1", SizeParam::Max, "jpg");
//! assert_eq!(request.to_string(), "https://example.org/iiif/p1/full/max/0/default.jpg");
//!
//! let parsed = ImageRequest::parse(&request.to_string()).unwrap();
//! assert_eq!(parsed.base, "https://example.org/iiif/p1");
//! ```

mod extension;
mod info;
mod uri;

pub use extension::{
    FALLBACK_EXTENSION, KNOWN_FORMATS, default_suffix_extension, extension_for_mime,
    identifier_extension, is_known_extension, resolve_extension,
};
pub use info::ImageInfo;
pub use uri::{ImageRequest, SizeParam, info_json_uri};
