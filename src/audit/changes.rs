//! Change detection
//!
//! Compares an entity's pending field values with the persisted ones and
//! produces the list of fields that changed.

use crate::models::{Auditable, FieldValue};

/// One changed field of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field_name: String,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

impl FieldChange {
    pub fn new(
        field_name: impl Into<String>,
        old_value: impl Into<FieldValue>,
        new_value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }
}

/// First value of a history list, with entity references replaced by their
/// identifier. An empty list yields the empty string.
pub fn value_or_reference(values: &[FieldValue]) -> FieldValue {
    match values.first() {
        Some(value) => value.clone().into_identity_or_value(),
        None => FieldValue::empty(),
    }
}

/// Changed fields among `field_names`, in the order given
pub fn detect_changes<E, S>(entity: &E, field_names: &[S]) -> Vec<FieldChange>
where
    E: Auditable + ?Sized,
    S: AsRef<str>,
{
    field_names
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let history = entity.history(name);
            if !history.has_changes() {
                return None;
            }
            Some(FieldChange {
                field_name: name.to_string(),
                old_value: value_or_reference(&history.deleted),
                new_value: value_or_reference(&history.added),
            })
        })
        .collect()
}

/// Changed fields among all the entity's declared fields
pub fn detect_all_changes<E: Auditable + ?Sized>(entity: &E) -> Vec<FieldChange> {
    let names = entity.field_names();
    detect_changes(entity, names.as_slice())
}
