//! Label normalization.
//!
//! Labels show up as plain strings, lists, JSON-LD value objects and
//! language maps depending on API version and publisher. [`Label`] names
//! each shape once so that nothing downstream inspects raw JSON types.

use serde_json::{Map, Value};

/// The shapes a label can take.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Label<'a> {
    /// No label, or `null`.
    Absent,
    /// `"label": "Folio 1r"`
    Text(&'a str),
    /// `"label": 12`
    Number(&'a serde_json::Number),
    /// `"label": ["Folio 1r", "f. 1r"]`, resolved to the first element.
    List(&'a [Value]),
    /// `"label": {"@value": "Folio 1r", "@language": "en"}`
    ValueObject(&'a Value),
    /// `"label": {"en": ["Folio 1r"], "it": ["Foglio 1r"]}`, resolved to the
    /// first language in document order.
    Localized(&'a Map<String, Value>),
    /// Anything else (`true`, ...).
    Unsupported,
}

impl<'a> Label<'a> {
    pub(crate) fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(text)) => Self::Text(text),
            Some(Value::Number(number)) => Self::Number(number),
            Some(Value::Array(items)) => Self::List(items),
            Some(Value::Object(map)) => match map.get("@value") {
                Some(inner) => Self::ValueObject(inner),
                None => Self::Localized(map),
            },
            Some(Value::Bool(_)) => Self::Unsupported,
        }
    }

    pub(crate) fn resolve(self) -> Option<String> {
        match self {
            Self::Absent | Self::Unsupported => None,
            Self::Text(text) => Some(text.trim().to_string()),
            Self::Number(number) => Some(number.to_string()),
            Self::List(items) => Label::classify(items.first()).resolve(),
            Self::ValueObject(inner) => Label::classify(Some(inner)).resolve(),
            Self::Localized(map) => Label::classify(map.values().next()).resolve(),
        }
    }
}

/// Resolves a label of any supported shape to a single string.
///
/// Returns `None` when the label is absent or has no usable text.
#[must_use]
pub fn resolve_label(value: Option<&Value>) -> Option<String> {
    Label::classify(value).resolve().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_plain_string() {
        assert_eq!(resolve_label(Some(&json!(" Codex A "))), Some("Codex A".to_string()));
    }

    #[test]
    fn test_list_takes_first() {
        assert_eq!(
            resolve_label(Some(&json!(["first", "second"]))),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_localized_map_takes_first_language_in_document_order() {
        let label: Value =
            serde_json::from_str(r#"{"it": ["Registro dei nati"], "en": ["Birth register"]}"#)
                .unwrap_or(Value::Null);
        assert_eq!(resolve_label(Some(&label)), Some("Registro dei nati".to_string()));
    }

    #[test]
    fn test_json_ld_value_objects() {
        assert_eq!(
            resolve_label(Some(&json!({"@value": "Folio 1", "@language": "en"}))),
            Some("Folio 1".to_string())
        );
        assert_eq!(
            resolve_label(Some(&json!([
                {"@value": "Folio 1", "@language": "en"},
                {"@value": "Foglio 1", "@language": "it"}
            ]))),
            Some("Folio 1".to_string())
        );
    }

    #[test]
    fn test_number_label() {
        assert_eq!(resolve_label(Some(&json!(12))), Some("12".to_string()));
    }

    #[test]
    fn test_absent_and_unusable_labels() {
        assert_eq!(resolve_label(None), None);
        assert_eq!(resolve_label(Some(&Value::Null)), None);
        assert_eq!(resolve_label(Some(&json!(true))), None);
        assert_eq!(resolve_label(Some(&json!([]))), None);
        assert_eq!(resolve_label(Some(&json!({}))), None);
        assert_eq!(resolve_label(Some(&json!({"none": []}))), None);
        assert_eq!(resolve_label(Some(&json!("   "))), None);
    }
}
