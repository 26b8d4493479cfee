//! Directory and file naming for downloaded pages.
//!
//! Manifest labels and canvas labels come straight from remote documents, so
//! every name that reaches the file system goes through [`sanitize_name`].

/// Upper bound on the length of a sanitized name, in UTF-8 bytes.
///
/// File systems cap a path component at 255 bytes; the slack covers the
/// `ERR_` prefix, duplicate suffixes and `_n.ext` page suffixes.
pub const MAX_NAME_BYTES: usize = 200;

/// Prefix given to the directory of a manifest with failed pages.
pub const ERROR_DIR_PREFIX: &str = "ERR_";

/// Sanitizes a label for use as a single path component.
///
/// Path separators become spaces, colons and control characters are dropped,
/// characters rejected by common file systems become `_`, and the result is
/// cut at a character boundary to at most [`MAX_NAME_BYTES`] and trimmed.
/// Applying it twice yields the same string as applying it once.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut capped = String::with_capacity(name.len().min(MAX_NAME_BYTES));
    let kept = name.chars().filter_map(|c| match c {
        '/' | '\\' => Some(' '),
        ':' => None,
        '*' | '?' | '"' | '<' | '>' | '|' => Some('_'),
        c if c.is_control() => None,
        c => Some(c),
    });
    for c in kept {
        if capped.len() + c.len_utf8() > MAX_NAME_BYTES {
            break;
        }
        capped.push(c);
    }

    let trimmed = capped.trim();
    if trimmed == "." || trimmed == ".." {
        return "_".to_string();
    }
    trimmed.to_string()
}

/// How page files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNaming {
    /// `p001`, `p002`, ...
    Numbered,
    /// The sanitized canvas label.
    Label,
    /// The sanitized canvas label followed by `_pNNN`, for labels shared by
    /// several canvases of one manifest.
    LabelWithIndex,
}

/// Builds the file name of one page image.
///
/// `index` is the 1-based page number. Label naming falls back to the
/// numbered form when the label sanitizes to nothing. `candidate` is the
/// 1-based candidate number, given only when a page contributes more than
/// one image.
#[must_use]
pub fn page_filename(
    index: usize,
    label: &str,
    extension: &str,
    naming: PageNaming,
    candidate: Option<usize>,
) -> String {
    let numbered = format!("p{index:03}");
    let sanitized = match naming {
        PageNaming::Numbered => String::new(),
        PageNaming::Label | PageNaming::LabelWithIndex => sanitize_name(label),
    };
    let stem = match naming {
        _ if sanitized.is_empty() => numbered,
        PageNaming::LabelWithIndex => format!("{sanitized}_{numbered}"),
        _ => sanitized,
    };

    match candidate {
        Some(n) => format!("{stem}_{n}.{extension}"),
        None => format!("{stem}.{extension}"),
    }
}

/// Returns the name of the directory used for a manifest with failed pages.
#[must_use]
pub fn error_dir_name(dir_name: &str) -> String {
    format!("{ERROR_DIR_PREFIX}{dir_name}")
}
