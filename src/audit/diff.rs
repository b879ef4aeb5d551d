//! Diff rendering for audit entries
//!
//! Turns update details (`{field: {old_value, new_value}}`) and change lists
//! into human-readable summaries like `age: 30 -> 31`.

use serde_json::Value;

use super::changes::FieldChange;
use super::encoding::encode_value;
use super::entry::truncate_chars;

/// One `field: old -> new` line per field of an update entry
///
/// Returns `None` when the details are not shaped like an update payload or
/// list no fields.
pub fn update_detail_lines(details: &Value) -> Option<Vec<String>> {
    let fields = details.as_object()?;
    let mut lines = Vec::new();

    for (field, pair) in fields {
        let pair = pair.as_object()?;
        let old = pair.get("old_value")?;
        let new = pair.get("new_value")?;
        lines.push(format!("{}: {} -> {}", field, format_value(old), format_value(new)));
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}

/// Summarize the details of an update entry on one line
pub fn describe_update_details(details: &Value) -> Option<String> {
    update_detail_lines(details).map(|lines| lines.join(", "))
}

/// Summarize a change list produced by the change detector
pub fn describe_changes(changes: &[FieldChange]) -> Option<String> {
    if changes.is_empty() {
        return None;
    }
    Some(
        changes
            .iter()
            .map(|c| {
                format!(
                    "{}: {} -> {}",
                    c.field_name,
                    format_value(&encode_value(&c.old_value)),
                    format_value(&encode_value(&c.new_value))
                )
            })
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Format a JSON value for human-readable display
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            // Truncate long strings
            if s.chars().count() > 50 {
                format!("\"{}...\"", truncate_chars(s, 47))
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => match obj.get(super::encoding::OPAQUE_TAG) {
            Some(Value::String(tag)) => format!("<{}>", tag),
            _ => format!("{{{} fields}}", obj.len()),
        },
    }
}
