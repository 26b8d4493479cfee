//! Presentation API version and document type detection.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use super::error::ManifestError;

const V2_CONTEXT_SUFFIX: &str = "2/context.json";
const V3_CONTEXT_SUFFIX: &str = "3/context.json";

/// Presentation API major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IiifVersion {
    /// Presentation API 2.x (`sequences`/`canvases`, JSON-LD `@` keys).
    V2,
    /// Presentation API 3.x (`items`, plain keys).
    V3,
}

impl IiifVersion {
    /// Key holding the document type.
    #[must_use]
    pub fn type_key(self) -> &'static str {
        match self {
            Self::V2 => "@type",
            Self::V3 => "type",
        }
    }

    /// Key holding a resource identifier.
    #[must_use]
    pub fn id_key(self) -> &'static str {
        match self {
            Self::V2 => "@id",
            Self::V3 => "id",
        }
    }

    /// Type value of a manifest.
    #[must_use]
    pub fn manifest_type(self) -> &'static str {
        match self {
            Self::V2 => "sc:Manifest",
            Self::V3 => "Manifest",
        }
    }

    /// Type value of a collection.
    #[must_use]
    pub fn collection_type(self) -> &'static str {
        match self {
            Self::V2 => "sc:Collection",
            Self::V3 => "Collection",
        }
    }

    /// Key listing the members of a collection.
    #[must_use]
    pub fn members_key(self) -> &'static str {
        match self {
            Self::V2 => "manifests",
            Self::V3 => "items",
        }
    }

    /// Whether the paired Image API accepts `full` as a size.
    ///
    /// Image API 3 dropped it in favour of `max`.
    #[must_use]
    pub fn supports_full_size(self) -> bool {
        matches!(self, Self::V2)
    }
}

impl fmt::Display for IiifVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2 => f.write_str("2.0"),
            Self::V3 => f.write_str("3.0"),
        }
    }
}

/// What a top-level document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// One paginated work.
    Manifest,
    /// A list of manifest references.
    Collection,
}

/// Classifies a document as Presentation API 2 or 3 from its `@context`.
///
/// The context is a string, or an array whose last element is authoritative.
///
/// # Errors
///
/// Returns [`ManifestError::UnsupportedVersion`] when the context is missing
/// or names neither version.
pub fn detect_version(doc: &Value) -> Result<IiifVersion, ManifestError> {
    let context = match doc.get("@context") {
        Some(Value::String(context)) => Some(context.as_str()),
        Some(Value::Array(contexts)) => contexts.last().and_then(Value::as_str),
        _ => None,
    };
    let Some(context) = context else {
        return Err(ManifestError::UnsupportedVersion {
            context: doc
                .get("@context")
                .map_or_else(|| "missing".to_string(), Value::to_string),
        });
    };

    let version = if context.ends_with(V2_CONTEXT_SUFFIX) {
        IiifVersion::V2
    } else if context.ends_with(V3_CONTEXT_SUFFIX) {
        IiifVersion::V3
    } else {
        return Err(ManifestError::UnsupportedVersion {
            context: context.to_string(),
        });
    };
    debug!(%version, context, "detected presentation API version");
    Ok(version)
}

/// Tells a manifest from a collection using the version's type key.
///
/// # Errors
///
/// Returns [`ManifestError::UnsupportedType`] for any other type.
pub fn detect_kind(doc: &Value, version: IiifVersion) -> Result<DocumentKind, ManifestError> {
    let found = doc.get(version.type_key()).and_then(Value::as_str);
    match found {
        Some(t) if t == version.manifest_type() => Ok(DocumentKind::Manifest),
        Some(t) if t == version.collection_type() => Ok(DocumentKind::Collection),
        Some(t) => Err(ManifestError::UnsupportedType {
            found: t.to_string(),
        }),
        None => Err(ManifestError::UnsupportedType {
            found: "missing".to_string(),
        }),
    }
}

/// Lists the document URIs referenced by a collection, in order.
///
/// Members without an identifier are skipped.
///
/// # Errors
///
/// Returns [`ManifestError::MissingField`] when the member list is absent.
pub fn collection_members(doc: &Value, version: IiifVersion) -> Result<Vec<String>, ManifestError> {
    let members = doc
        .get(version.members_key())
        .and_then(Value::as_array)
        .ok_or_else(|| ManifestError::missing_field(version.members_key()))?;

    Ok(members
        .iter()
        .filter_map(|member| match member {
            Value::String(uri) => Some(uri.clone()),
            other => other
                .get(version.id_key())
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect())
}
