//! Lenient field readers shared by both parsers.
//!
//! Optional fields that are missing or mistyped are logged and reported as
//! absent; only the parsers decide what is fatal.

use serde_json::Value;
use tracing::warn;

/// Reads a string field.
pub(crate) fn string_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Reads a pixel dimension, accepting numeric strings.
pub(crate) fn dimension_field(object: &Value, key: &'static str, page: usize) -> Option<u32> {
    match object.get(key)? {
        Value::Number(number) => {
            let parsed = number
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0 && *f <= f64::from(u32::MAX))
                        .map(|f| f.round() as u32)
                });
            if parsed.is_none() {
                warn!(page, field = key, value = %number, "ignoring out of range dimension");
            }
            parsed
        }
        Value::String(text) => {
            let parsed = text.trim().parse::<u32>().ok();
            match parsed {
                Some(_) => warn!(page, field = key, value = %text, "dimension given as string"),
                None => warn!(page, field = key, value = %text, "ignoring non-numeric dimension"),
            }
            parsed
        }
        other => {
            warn!(page, field = key, value = %other, "ignoring mistyped dimension");
            None
        }
    }
}

/// Reads the identifier of an image service.
///
/// `service` may be one object or an array of them; the identifier may sit
/// under `@id` (Image API 2) or `id` (Image API 3).
pub(crate) fn service_id(service: Option<&Value>) -> Option<String> {
    let service = match service? {
        Value::Array(services) => services.first()?,
        other => other,
    };
    string_field(service, "@id")
        .or_else(|| string_field(service, "id"))
        .map(|id| id.trim_end_matches('/').to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_dimension_field_shapes() {
        let canvas = json!({"a": 1200, "b": "800", "c": "wide", "d": 1.6e3, "e": -4, "f": null});
        assert_eq!(dimension_field(&canvas, "a", 1), Some(1200));
        assert_eq!(dimension_field(&canvas, "b", 1), Some(800));
        assert_eq!(dimension_field(&canvas, "c", 1), None);
        assert_eq!(dimension_field(&canvas, "d", 1), Some(1600));
        assert_eq!(dimension_field(&canvas, "e", 1), None);
        assert_eq!(dimension_field(&canvas, "f", 1), None);
        assert_eq!(dimension_field(&canvas, "missing", 1), None);
    }

    #[test]
    fn test_service_id_shapes() {
        assert_eq!(
            service_id(Some(&json!({"@id": "https://x.org/iiif/p1/"}))),
            Some("https://x.org/iiif/p1".to_string())
        );
        assert_eq!(
            service_id(Some(&json!([{"id": "https://x.org/iiif/3/p1", "type": "ImageService3"}]))),
            Some("https://x.org/iiif/3/p1".to_string())
        );
        assert_eq!(service_id(Some(&json!([]))), None);
        assert_eq!(service_id(Some(&json!({"profile": "level1"}))), None);
        assert_eq!(service_id(None), None);
    }
}
