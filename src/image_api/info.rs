//! The image-information document (`info.json`) served by an image service.

use serde::Deserialize;

/// The subset of `info.json` used to pick a download width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageInfo {
    /// Full width of the source image.
    #[serde(default)]
    pub width: Option<u32>,
    /// Full height of the source image.
    #[serde(default)]
    pub height: Option<u32>,
    /// Largest width the server is willing to deliver.
    #[serde(default, rename = "maxWidth")]
    pub max_width: Option<u32>,
}

impl ImageInfo {
    /// Returns the widest image the server will deliver, if it says.
    #[must_use]
    pub fn deliverable_width(&self) -> Option<u32> {
        match (self.width, self.max_width) {
            (Some(width), Some(max)) => Some(width.min(max)),
            (width, max) => width.or(max),
        }
        .filter(|w| *w > 0)
    }
}
