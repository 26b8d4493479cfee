//! Canonical Image API request URIs.
//!
//! `{base}/{region}/{size}/{rotation}/{quality}.{format}`

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Regex for the canonical request grammar.
///
/// `base` is greedy: the four trailing parameter segments never contain `/`,
/// so it always stops right before the region.
#[allow(clippy::expect_used)]
static CANONICAL_URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<base>.+)/",
        r"(?P<region>full|square|\d+,\d+,\d+,\d+|pct:\d+(?:\.\d+)?,\d+(?:\.\d+)?,\d+(?:\.\d+)?,\d+(?:\.\d+)?)/",
        r"(?P<size>\^?(?:full|max|pct:\d+(?:\.\d+)?|!?\d*,\^?\d*))/",
        r"(?P<rotation>!?\d+(?:\.\d+)?)/",
        r"(?P<quality>color|gray|bitonal|default)\.",
        r"(?P<format>jpg|tif|png|gif|jp2|pdf|webp)$",
    ))
    .expect("canonical URI regex is valid") // Static pattern, safe to panic
});

/// The size parameter of a full-image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeParam {
    /// `full`: the full image (Image API 2 only).
    Full,
    /// `max`: the largest size the server offers.
    Max,
    /// `{w},`: scaled to a width, height proportional.
    Width(u32),
}

impl fmt::Display for SizeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Max => f.write_str("max"),
            Self::Width(width) => write!(f, "{width},"),
        }
    }
}

/// A parsed or constructed Image API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub base: String,
    pub region: String,
    pub size: String,
    pub rotation: String,
    pub quality: String,
    pub format: String,
}

impl ImageRequest {
    /// Builds the request for the whole, unrotated image in default quality.
    #[must_use]
    pub fn full_image(base: &str, size: SizeParam, format: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            region: "full".to_string(),
            size: size.to_string(),
            rotation: "0".to_string(),
            quality: "default".to_string(),
            format: format.to_string(),
        }
    }

    /// Splits a URI into its request components.
    ///
    /// Returns `None` when the URI does not follow the canonical grammar.
    #[must_use]
    pub fn parse(uri: &str) -> Option<Self> {
        let caps = CANONICAL_URI_PATTERN.captures(uri)?;
        Some(Self {
            base: caps["base"].to_string(),
            region: caps["region"].to_string(),
            size: caps["size"].to_string(),
            rotation: caps["rotation"].to_string(),
            quality: caps["quality"].to_string(),
            format: caps["format"].to_string(),
        })
    }
}

impl fmt::Display for ImageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}.{}",
            self.base, self.region, self.size, self.rotation, self.quality, self.format
        )
    }
}

/// Returns the URI of the image-information document for a service base.
#[must_use]
pub fn info_json_uri(base: &str) -> String {
    format!("{}/info.json", base.trim_end_matches('/'))
}
