//! Serialization of field values into audit details
//!
//! Scalars (strings, numbers, booleans, null) are written as plain JSON so
//! they read back unchanged. Lists and maps are encoded structurally.
//! Everything else is wrapped in a tagged container holding base64 bytes:
//!
//! ```json
//! {"__opaque__": "timestamp", "data": "MjAyNi0xMC0xOVQxMjowMDowMC4wMDAwMDBa"}
//! ```
//!
//! Encoding never fails; decoding reconstructs the original value.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::error::{AuditError, AuditResult};
use crate::models::{EntityRef, FieldValue, Snapshot};

/// Key marking an opaque container
pub const OPAQUE_TAG: &str = "__opaque__";

/// Key holding the base64 payload of an opaque container
pub const OPAQUE_DATA: &str = "data";

const TAG_FLOAT: &str = "float";
const TAG_TIMESTAMP: &str = "timestamp";
const TAG_BYTES: &str = "bytes";
const TAG_REFERENCE: &str = "reference";

fn opaque(tag: &str, bytes: &[u8]) -> Value {
    json!({ OPAQUE_TAG: tag, OPAQUE_DATA: STANDARD.encode(bytes) })
}

/// Encode a single value as JSON
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(i) => Value::from(*i),
        FieldValue::Float(x) => serde_json::Number::from_f64(*x)
            .map(Value::Number)
            .unwrap_or_else(|| opaque(TAG_FLOAT, &x.to_le_bytes())),
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Timestamp(ts) => opaque(
            TAG_TIMESTAMP,
            ts.to_rfc3339_opts(SecondsFormat::Micros, true).as_bytes(),
        ),
        FieldValue::Bytes(b) => opaque(TAG_BYTES, b),
        FieldValue::Reference(r) => opaque(TAG_REFERENCE, format!("{}:{}", r.kind, r.id).as_bytes()),
        FieldValue::List(items) => Value::Array(items.iter().map(encode_value).collect()),
        FieldValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect(),
        ),
    }
}

/// Decode a JSON value produced by [`encode_value`]
///
/// Objects that look like opaque containers but cannot be decoded are kept
/// as plain maps.
pub fn decode_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Array(items) => FieldValue::List(items.iter().map(decode_value).collect()),
        Value::Object(map) => decode_opaque(map).unwrap_or_else(|| {
            FieldValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect(),
            )
        }),
    }
}

fn decode_opaque(map: &Map<String, Value>) -> Option<FieldValue> {
    if map.len() != 2 {
        return None;
    }
    let tag = map.get(OPAQUE_TAG)?.as_str()?;
    let bytes = STANDARD.decode(map.get(OPAQUE_DATA)?.as_str()?).ok()?;

    match tag {
        TAG_FLOAT => {
            let raw: [u8; 8] = bytes.try_into().ok()?;
            Some(FieldValue::Float(f64::from_le_bytes(raw)))
        }
        TAG_TIMESTAMP => {
            let text = String::from_utf8(bytes).ok()?;
            let ts = DateTime::parse_from_rfc3339(&text).ok()?;
            Some(FieldValue::Timestamp(ts.with_timezone(&Utc)))
        }
        TAG_BYTES => Some(FieldValue::Bytes(bytes)),
        TAG_REFERENCE => {
            let text = String::from_utf8(bytes).ok()?;
            let (kind, id) = text.rsplit_once(':')?;
            Some(FieldValue::Reference(EntityRef::new(kind, id.parse().ok()?)))
        }
        _ => None,
    }
}

/// Encode a full snapshot as a JSON object
pub fn encode_snapshot(snapshot: &Snapshot) -> Value {
    Value::Object(
        snapshot
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Encode bound statement parameters as a JSON array
pub fn encode_params(params: &[FieldValue]) -> Value {
    Value::Array(params.iter().map(encode_value).collect())
}

/// Decode serialized details back into a field map
pub fn decode_details(text: &str) -> AuditResult<Snapshot> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect()),
        other => Err(AuditError::Json(format!(
            "Expected an object in audit details, found {}",
            other
        ))),
    }
}
