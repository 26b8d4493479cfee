//! File extension derivation from declared formats and image identifiers.

use tracing::warn;
use url::Url;

/// The MIME types with a known file extension.
pub const KNOWN_FORMATS: [(&str, &str); 7] = [
    ("image/jpeg", "jpg"),
    ("image/tiff", "tif"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/jp2", "jp2"),
    ("application/pdf", "pdf"),
    ("image/webp", "webp"),
];

/// Extension used when neither the format nor the identifier tells.
///
/// `jpg` is the one format every Image API server must support.
pub const FALLBACK_EXTENSION: &str = "jpg";

/// Maps a MIME type to its file extension (without the dot).
///
/// Returns `None` for anything outside [`KNOWN_FORMATS`]. MIME parameters
/// (`; charset=..`) and letter case are ignored.
#[must_use]
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or("").trim();
    KNOWN_FORMATS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Returns true when `ext` is one of the extensions in [`KNOWN_FORMATS`].
#[must_use]
pub fn is_known_extension(ext: &str) -> bool {
    KNOWN_FORMATS.iter().any(|(_, known)| *known == ext)
}

/// Returns the extension of a `.../default.<ext>` identifier.
#[must_use]
pub fn default_suffix_extension(identifier: &str) -> Option<String> {
    let segment = last_path_segment(identifier)?;
    let ext = segment.strip_prefix("default.")?;
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| normalize_extension(ext))
}

/// Returns the extension of the identifier's last path segment, when known.
#[must_use]
pub fn identifier_extension(identifier: &str) -> Option<String> {
    let segment = last_path_segment(identifier)?;
    let (_, ext) = segment.rsplit_once('.')?;
    let ext = normalize_extension(ext);
    is_known_extension(&ext).then_some(ext)
}

/// Chooses the extension for an image candidate.
///
/// Order of precedence:
/// 1. `default.<ext>` at the end of the identifier, when it disagrees with the
///    declared format (servers often mislabel the format)
/// 2. the declared format
/// 3. a known extension on the identifier
/// 4. [`FALLBACK_EXTENSION`]
#[must_use]
pub fn resolve_extension(format: Option<&str>, identifier: &str) -> String {
    let declared = format.and_then(extension_for_mime);

    if let Some(from_identifier) = default_suffix_extension(identifier) {
        if declared.is_some_and(|d| d != from_identifier) {
            warn!(
                identifier,
                format = format.unwrap_or_default(),
                extension = %from_identifier,
                "declared format disagrees with identifier, using identifier extension"
            );
        }
        return from_identifier;
    }

    if let Some(declared) = declared {
        return declared.to_string();
    }

    if let Some(from_identifier) = identifier_extension(identifier) {
        return from_identifier;
    }

    warn!(
        identifier,
        format = format.unwrap_or_default(),
        extension = FALLBACK_EXTENSION,
        "no usable format, using fallback extension"
    );
    FALLBACK_EXTENSION.to_string()
}

fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_ascii_lowercase();
    match lower.as_str() {
        "jpeg" => "jpg".to_string(),
        "tiff" => "tif".to_string(),
        _ => lower,
    }
}

fn last_path_segment(identifier: &str) -> Option<String> {
    if let Ok(url) = Url::parse(identifier) {
        let segment = url.path_segments()?.next_back()?;
        return (!segment.is_empty()).then(|| segment.to_string());
    }
    let path = identifier.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    (!segment.is_empty()).then(|| segment.to_string())
}
