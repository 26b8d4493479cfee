//! Presentation API 2 parser.
//!
//! ```text
//! manifest
//! ├── @id, label
//! └── sequences[0]
//!     └── canvases[]
//!         ├── label, width, height
//!         └── images[]
//!             └── resource { @id, format, service }   (or oa:Choice → default)
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use super::fields::{dimension_field, service_id, string_field};
use super::label::resolve_label;
use super::{
    ImageCandidate, IiifVersion, Manifest, ManifestError, Page, ParseOptions, UNTITLED_LABEL,
};

const CHOICE_TYPE: &str = "oa:Choice";

pub(super) fn parse(doc: &Value, options: &ParseOptions) -> Result<Manifest, ManifestError> {
    let id = string_field(doc, "@id").unwrap_or_else(|| {
        warn!("manifest has no '@id'");
        String::new()
    });
    let label = resolve_label(doc.get("label")).unwrap_or_else(|| {
        warn!(id = %id, "manifest has no usable 'label'");
        UNTITLED_LABEL.to_string()
    });

    let sequences = doc
        .get("sequences")
        .and_then(Value::as_array)
        .ok_or_else(|| ManifestError::missing_field("sequences"))?;
    if sequences.len() > 1 {
        debug!(sequences = sequences.len(), "using the first sequence only");
    }
    let canvases = sequences
        .first()
        .and_then(|sequence| sequence.get("canvases"))
        .and_then(Value::as_array)
        .ok_or_else(|| ManifestError::missing_field("canvases"))?;

    let pages = canvases
        .iter()
        .enumerate()
        .map(|(i, canvas)| parse_canvas(i + 1, canvas, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Manifest {
        id,
        label,
        version: IiifVersion::V2,
        pages,
    })
}

fn parse_canvas(index: usize, canvas: &Value, options: &ParseOptions) -> Result<Page, ManifestError> {
    let label = resolve_label(canvas.get("label")).unwrap_or_else(|| {
        debug!(page = index, "canvas has no label, using page number");
        index.to_string()
    });

    let Some(images) = canvas.get("images").and_then(Value::as_array) else {
        warn!(page = index, "canvas has no 'images' list");
        let width = dimension_field(canvas, "width", index);
        let height = dimension_field(canvas, "height", index);
        return Ok(Page::new(label, width, height));
    };

    let keep = if options.all_candidates { images.len() } else { 1 };
    let resources: Vec<&Value> = images
        .iter()
        .take(keep)
        .map(|annotation| {
            annotation
                .get("resource")
                .map(choice_default)
                .ok_or(ManifestError::MissingImageId { page: index })
        })
        .collect::<Result<_, _>>()?;

    let first_resource = resources.first().copied();
    let width = dimension_field(canvas, "width", index)
        .or_else(|| first_resource.and_then(|r| dimension_field(r, "width", index)));
    let height = dimension_field(canvas, "height", index)
        .or_else(|| first_resource.and_then(|r| dimension_field(r, "height", index)));
    if width.is_none() || height.is_none() {
        warn!(page = index, "canvas dimensions missing");
    }

    let mut page = Page::new(label, width, height);
    for resource in resources {
        page.candidates.push(parse_resource(index, resource)?);
    }
    Ok(page)
}

/// An `oa:Choice` offers variants of one image; only its default is used.
fn choice_default(resource: &Value) -> &Value {
    let is_choice = resource.get("@type").and_then(Value::as_str) == Some(CHOICE_TYPE);
    match resource.get("default") {
        Some(default) if is_choice => default,
        _ => resource,
    }
}

fn parse_resource(index: usize, resource: &Value) -> Result<ImageCandidate, ManifestError> {
    let id = string_field(resource, "@id")
        .filter(|id| !id.is_empty())
        .ok_or(ManifestError::MissingImageId { page: index })?;

    let format = string_field(resource, "format");
    if format.is_none() {
        warn!(page = index, id = %id, "image resource has no 'format'");
    }

    Ok(ImageCandidate::new(id, format, service_id(resource.get("service"))))
}
