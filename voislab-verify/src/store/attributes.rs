//! DynamoDB attribute conversion
//!
//! Table items are converted to plain JSON before being interpreted as
//! [`TrackMetadataRecord`]s, so backups can be written as JSON lines and
//! attributes the model does not name survive unchanged.

use crate::error::{VerifyError, VerifyResult};
use crate::store::FieldValue;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use voislab_common::TrackMetadataRecord;

/// Convert one table item to a JSON object
pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Value {
    Value::Object(
        item.iter()
            .map(|(name, value)| (name.clone(), attribute_to_json(value)))
            .collect::<Map<String, Value>>(),
    )
}

/// Convert one attribute value to JSON
///
/// Binary values become base64 strings; numbers that fit neither `i64` nor
/// `f64` are kept as their decimal string.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => item_to_json(map),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::B(blob) => Value::String(STANDARD.encode(blob.as_ref())),
        AttributeValue::Bs(blobs) => Value::Array(
            blobs
                .iter()
                .map(|b| Value::String(STANDARD.encode(b.as_ref())))
                .collect(),
        ),
        _ => {
            tracing::warn!("Unknown DynamoDB attribute type, storing null");
            Value::Null
        }
    }
}

fn number_to_json(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Interpret a table item as a track record
pub fn record_from_item(item: &HashMap<String, AttributeValue>) -> VerifyResult<TrackMetadataRecord> {
    TrackMetadataRecord::from_json(item_to_json(item))
        .map_err(|e| VerifyError::Record(format!("Malformed track item: {}", e)))
}

/// Attribute value for a corrected field
pub fn field_value_to_attribute(value: &FieldValue) -> AttributeValue {
    match value {
        FieldValue::Number(n) => AttributeValue::N(n.to_string()),
        FieldValue::Text(s) => AttributeValue::S(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::Blob;
    use serde_json::json;

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(attribute_to_json(&s("x")), json!("x"));
        assert_eq!(attribute_to_json(&AttributeValue::N("180".into())), json!(180));
        assert_eq!(attribute_to_json(&AttributeValue::N("1.5".into())), json!(1.5));
        assert_eq!(attribute_to_json(&AttributeValue::Bool(true)), json!(true));
        assert_eq!(attribute_to_json(&AttributeValue::Null(true)), Value::Null);
        assert_eq!(
            attribute_to_json(&AttributeValue::B(Blob::new(vec![1u8, 2, 3]))),
            json!("AQID")
        );
    }

    #[test]
    fn test_nested_conversion() {
        let mut inner = HashMap::new();
        inner.insert("k".to_string(), AttributeValue::N("7".into()));
        let value = AttributeValue::L(vec![AttributeValue::M(inner), s("a")]);
        assert_eq!(attribute_to_json(&value), json!([{"k": 7}, "a"]));

        let set = AttributeValue::Ss(vec!["rock".into(), "pop".into()]);
        assert_eq!(attribute_to_json(&set), json!(["rock", "pop"]));
    }

    #[test]
    fn test_record_from_item() {
        let mut item = HashMap::new();
        item.insert("id".to_string(), s("t-1"));
        item.insert("createdDate".to_string(), s("2025-01-01T00:00:00"));
        item.insert("duration".to_string(), AttributeValue::N("212".into()));
        item.insert("status".to_string(), s("enhanced"));
        item.insert("fileSize".to_string(), AttributeValue::N("4096".into()));

        let record = record_from_item(&item).unwrap();
        assert_eq!(record.id, "t-1");
        assert_eq!(record.duration, Some(212));
        assert_eq!(record.extra.get("fileSize"), Some(&json!(4096)));
    }

    #[test]
    fn test_item_without_id_is_rejected() {
        let mut item = HashMap::new();
        item.insert("title".to_string(), s("Orphan"));
        assert!(matches!(record_from_item(&item), Err(VerifyError::Record(_))));
    }

    #[test]
    fn test_field_value_attribute_types() {
        assert_eq!(
            field_value_to_attribute(&FieldValue::Number(181)),
            AttributeValue::N("181".into())
        );
        assert_eq!(
            field_value_to_attribute(&FieldValue::Text("Song".into())),
            s("Song")
        );
    }
}
