//! The resolved configuration of one run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Invalid run configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A page range that is neither `all` nor `A-B`.
    #[error("invalid page range '{value}': expected 'all' or 'FIRST-LAST' with 1 <= FIRST <= LAST")]
    InvalidRange {
        /// The rejected input.
        value: String,
    },

    /// A fixed width of zero pixels.
    #[error("invalid width 0: the fixed width must be a positive number of pixels")]
    ZeroWidth,

    /// Page numbering starts at 1.
    #[error("invalid first page 0: pages are numbered from 1")]
    ZeroFirstPage,
}

/// A 1-based, inclusive page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: usize,
    /// `None` runs to the last page.
    pub last: Option<usize>,
}

impl Default for PageRange {
    fn default() -> Self {
        Self::all()
    }
}

impl PageRange {
    /// Every page.
    #[must_use]
    pub fn all() -> Self {
        Self {
            first: 1,
            last: None,
        }
    }

    /// Whether this range selects every page.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.first == 1 && self.last.is_none()
    }

    /// Zero-based `start..end` bounds within a manifest of `len` pages.
    ///
    /// Both ends are clamped, so a range past the end selects nothing.
    #[must_use]
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let start = self.first.saturating_sub(1).min(len);
        let end = self.last.map_or(len, |last| last.min(len)).max(start);
        (start, end)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last {
            None if self.first == 1 => f.write_str("all"),
            None => write!(f, "{}-end", self.first),
            Some(last) => write!(f, "{}-{last}", self.first),
        }
    }
}

impl FromStr for PageRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_range(s)
    }
}

/// `A-B` with positive integers written without leading zeros.
#[allow(clippy::expect_used)]
static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([1-9][0-9]*)-([1-9][0-9]*)$")
        .expect("page range regex is valid") // Static pattern, safe to panic
});

/// Parses `all` or `A-B` (positive integers, `A <= B`).
///
/// The input is matched exactly: no surrounding whitespace, no other case
/// of `all`, no leading zeros.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidRange`] for anything else.
pub fn parse_range(value: &str) -> Result<PageRange, ConfigError> {
    let invalid = || ConfigError::InvalidRange {
        value: value.to_string(),
    };
    if value == "all" {
        return Ok(PageRange::all());
    }

    let captures = RANGE_PATTERN.captures(value).ok_or_else(invalid)?;
    let bound = |group: usize| {
        captures
            .get(group)
            .and_then(|m| m.as_str().parse::<usize>().ok())
    };
    let (Some(first), Some(last)) = (bound(1), bound(2)) else {
        return Err(invalid());
    };
    if first > last {
        return Err(invalid());
    }
    Ok(PageRange {
        first,
        last: Some(last),
    })
}

/// Everything the orchestrator needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Manifest or collection: a local path or an `http(s)` URL.
    pub source: String,
    /// Root under which one directory per manifest is created.
    pub output_dir: PathBuf,
    pub pages: PageRange,
    /// Download pages whose file already exists.
    pub overwrite: bool,
    /// Name page files after canvas labels instead of `pNNN`.
    pub use_labels_as_filenames: bool,
    /// Keep every image of a canvas instead of only the first.
    pub download_all_candidates_per_page: bool,
    /// Request every page at this width.
    pub fixed_width: Option<u32>,
    /// `Referer` header sent with every request.
    pub referer: Option<String>,
    /// Query each image service's `info.json` for a better width.
    pub query_image_info: bool,
}

impl RunConfig {
    /// A configuration with defaults for everything but the source.
    pub fn new(source: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            pages: PageRange::all(),
            overwrite: false,
            use_labels_as_filenames: false,
            download_all_candidates_per_page: false,
            fixed_width: None,
            referer: None,
            query_image_info: false,
        }
    }

    /// Checks values that the types alone do not rule out.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero width or a zero first page.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fixed_width == Some(0) {
            return Err(ConfigError::ZeroWidth);
        }
        if self.pages.first == 0 {
            return Err(ConfigError::ZeroFirstPage);
        }
        if let Some(last) = self.pages.last
            && last < self.pages.first
        {
            return Err(ConfigError::InvalidRange {
                value: self.pages.to_string(),
            });
        }
        Ok(())
    }
}
