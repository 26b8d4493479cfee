//! Presentation API 3 parser.
//!
//! ```text
//! manifest
//! ├── id, label {lang: [..]}
//! └── items[]                        canvases
//!     ├── label, width, height
//!     └── items[0]                   annotation page
//!         └── items[]                annotations
//!             └── body               Image | SpecificResource { source }
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use super::fields::{dimension_field, service_id, string_field};
use super::label::resolve_label;
use super::{
    ImageCandidate, IiifVersion, Manifest, ManifestError, Page, ParseOptions, UNTITLED_LABEL,
};

const IMAGE_TYPE: &str = "Image";
const SPECIFIC_RESOURCE_TYPE: &str = "SpecificResource";

pub(super) fn parse(doc: &Value, options: &ParseOptions) -> Result<Manifest, ManifestError> {
    let id = string_field(doc, "id").unwrap_or_else(|| {
        warn!("manifest has no 'id'");
        String::new()
    });
    let label = resolve_label(doc.get("label")).unwrap_or_else(|| {
        warn!(id = %id, "manifest has no usable 'label'");
        UNTITLED_LABEL.to_string()
    });

    let canvases = doc
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| ManifestError::missing_field("items"))?;

    let pages = canvases
        .iter()
        .enumerate()
        .map(|(i, canvas)| parse_canvas(i + 1, canvas, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Manifest {
        id,
        label,
        version: IiifVersion::V3,
        pages,
    })
}

fn parse_canvas(index: usize, canvas: &Value, options: &ParseOptions) -> Result<Page, ManifestError> {
    let label = resolve_label(canvas.get("label")).unwrap_or_else(|| {
        debug!(page = index, "canvas has no label, using page number");
        index.to_string()
    });
    let mut page = Page::new(
        label,
        dimension_field(canvas, "width", index),
        dimension_field(canvas, "height", index),
    );

    let annotations = canvas
        .get("items")
        .and_then(Value::as_array)
        .and_then(|pages| pages.first())
        .and_then(|annotation_page| annotation_page.get("items"))
        .and_then(Value::as_array);
    let Some(annotations) = annotations else {
        warn!(page = index, "canvas has no annotation page");
        return Ok(page);
    };

    let keep = if options.all_candidates { annotations.len() } else { 1 };
    for annotation in annotations.iter().take(keep) {
        let Some(body) = annotation_body(annotation) else {
            warn!(page = index, "annotation has no body");
            continue;
        };
        let source = match body_source(body) {
            Ok(source) => source,
            Err(found) => {
                warn!(page = index, body_type = %found, "unsupported annotation body");
                page.defect = Some(format!("unsupported body type: {found}"));
                page.candidates.clear();
                return Ok(page);
            }
        };

        let is_first = page.candidates.is_empty();
        let (candidate, width, height) = parse_source(index, source)?;
        if is_first {
            page.width = width.or(page.width);
            page.height = height.or(page.height);
        }
        page.candidates.push(candidate);
    }

    if page.width.is_none() || page.height.is_none() {
        warn!(page = index, "canvas dimensions missing");
    }
    Ok(page)
}

fn annotation_body(annotation: &Value) -> Option<&Value> {
    match annotation.get("body")? {
        Value::Array(bodies) => bodies.first(),
        body => Some(body),
    }
}

/// Finds the image resource of a body, or returns the offending type.
fn body_source(body: &Value) -> Result<&Value, String> {
    let body_type = body.get("type").and_then(Value::as_str);
    match body_type {
        Some(IMAGE_TYPE) => Ok(body),
        Some(SPECIFIC_RESOURCE_TYPE) => body
            .get("source")
            .filter(|source| source.is_object() || source.is_string())
            .ok_or_else(|| format!("{SPECIFIC_RESOURCE_TYPE} without source")),
        Some(other) => Err(other.to_string()),
        None => Err("missing".to_string()),
    }
}

fn parse_source(
    index: usize,
    source: &Value,
) -> Result<(ImageCandidate, Option<u32>, Option<u32>), ManifestError> {
    // A bare string source is just the image id.
    if let Value::String(id) = source {
        if id.is_empty() {
            return Err(ManifestError::MissingImageId { page: index });
        }
        return Ok((ImageCandidate::new(id.clone(), None, None), None, None));
    }

    let id = string_field(source, "id")
        .filter(|id| !id.is_empty())
        .ok_or(ManifestError::MissingImageId { page: index })?;
    let format = string_field(source, "format");
    if format.is_none() {
        warn!(page = index, id = %id, "image resource has no 'format'");
    }
    let width = dimension_field(source, "width", index);
    let height = dimension_field(source, "height", index);

    let candidate = ImageCandidate::new(id, format, service_id(source.get("service")));
    Ok((candidate, width, height))
}
