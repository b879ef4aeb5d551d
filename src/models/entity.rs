//! The contract between persisted entities and the audit layer

use std::collections::BTreeMap;

use super::value::FieldValue;

/// Full set of an entity's current field values
pub type Snapshot = BTreeMap<String, FieldValue>;

/// Per-field change history since the entity was last persisted
///
/// Mirrors what a unit-of-work keeps for each attribute: the values added
/// by pending writes, the values they replaced, and the untouched value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldHistory {
    pub added: Vec<FieldValue>,
    pub unchanged: Vec<FieldValue>,
    pub deleted: Vec<FieldValue>,
}

impl FieldHistory {
    pub fn changed(old: Option<FieldValue>, new: FieldValue) -> Self {
        Self {
            added: vec![new],
            unchanged: Vec::new(),
            deleted: old.into_iter().collect(),
        }
    }

    pub fn unchanged(value: FieldValue) -> Self {
        Self {
            added: Vec::new(),
            unchanged: vec![value],
            deleted: Vec::new(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.deleted.is_empty()
    }
}

/// An entity whose writes can be audited
pub trait Auditable {
    /// Table or type name
    fn entity_name(&self) -> &str;

    /// Tracked field names in declaration order
    fn field_names(&self) -> Vec<String>;

    /// Change history of one field
    fn history(&self, field: &str) -> FieldHistory;

    /// Current values of all fields
    fn snapshot(&self) -> Snapshot;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_changes() {
        assert!(FieldHistory::changed(None, FieldValue::Int(1)).has_changes());
        assert!(!FieldHistory::unchanged(FieldValue::Int(1)).has_changes());
        assert!(!FieldHistory::default().has_changes());
    }

    #[test]
    fn test_changed_without_previous_value() {
        let h = FieldHistory::changed(None, FieldValue::Int(1));
        assert!(h.deleted.is_empty());
        assert_eq!(h.added, vec![FieldValue::Int(1)]);
    }
}
