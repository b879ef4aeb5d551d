//! Audit metadata embedded in entities
//!
//! Entities that want "who created / who last touched / when" carry an
//! [`AuditMetadata`] value, populated explicitly by the persistence layer on
//! insert and update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::FieldValue;
use crate::actor::ActorId;

pub const CREATED_BY_COLUMN: &str = "created_by_id";
pub const UPDATED_BY_COLUMN: &str = "updated_by_id";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Columns added to an entity carrying audit metadata
pub const AUDIT_COLUMNS: [&str; 4] = [
    CREATED_BY_COLUMN,
    UPDATED_BY_COLUMN,
    CREATED_AT_COLUMN,
    UPDATED_AT_COLUMN,
];

/// Creation and last-update attribution of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub created_by: ActorId,
    pub updated_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditMetadata {
    /// Metadata for a freshly created entity
    pub fn new(actor: ActorId, now: DateTime<Utc>) -> Self {
        Self {
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record an update; creation fields are left alone
    pub fn touch(&mut self, actor: ActorId, now: DateTime<Utc>) {
        self.updated_by = actor;
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Column/value pairs in [`AUDIT_COLUMNS`] order
    pub fn to_fields(&self) -> [(&'static str, FieldValue); 4] {
        [
            (CREATED_BY_COLUMN, FieldValue::Int(self.created_by.value())),
            (UPDATED_BY_COLUMN, FieldValue::Int(self.updated_by.value())),
            (CREATED_AT_COLUMN, FieldValue::Timestamp(self.created_at)),
            (UPDATED_AT_COLUMN, FieldValue::Timestamp(self.updated_at)),
        ]
    }

    /// Rebuild metadata from field values; `None` if any column is missing
    /// or holds an unexpected type
    pub fn from_fields<'a, F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<&'a FieldValue>,
    {
        Some(Self {
            created_by: stored_actor(lookup(CREATED_BY_COLUMN)?)?,
            updated_by: stored_actor(lookup(UPDATED_BY_COLUMN)?)?,
            created_at: stored_timestamp(lookup(CREATED_AT_COLUMN)?)?,
            updated_at: stored_timestamp(lookup(UPDATED_AT_COLUMN)?)?,
        })
    }
}

/// Whether a stored audit column already holds `value`
///
/// Rows read back from SQLite carry timestamps as text and may hold NULL
/// for the unknown actor, so values are compared by what they mean.
pub fn same_metadata_value(column: &str, stored: &FieldValue, value: &FieldValue) -> bool {
    match column {
        CREATED_BY_COLUMN | UPDATED_BY_COLUMN => {
            matches!((stored_actor(stored), stored_actor(value)), (Some(a), Some(b)) if a == b)
        }
        CREATED_AT_COLUMN | UPDATED_AT_COLUMN => {
            matches!((stored_timestamp(stored), stored_timestamp(value)), (Some(a), Some(b)) if a == b)
        }
        _ => stored == value,
    }
}

fn stored_actor(value: &FieldValue) -> Option<ActorId> {
    match value {
        FieldValue::Int(i) => Some(ActorId::new(*i)),
        FieldValue::Null => Some(ActorId::UNKNOWN),
        _ => None,
    }
}

fn stored_timestamp(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Timestamp(ts) => Some(*ts),
        FieldValue::Text(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    #[test]
    fn test_new_sets_both_actors() {
        let now = Utc::now();
        let meta = AuditMetadata::new(ActorId::new(3), now);
        assert_eq!(meta.created_by, ActorId::new(3));
        assert_eq!(meta.updated_by, ActorId::new(3));
        assert_eq!(meta.created_at, meta.updated_at);
    }

    #[test]
    fn test_touch_keeps_creation() {
        let now = Utc::now();
        let mut meta = AuditMetadata::new(ActorId::new(3), now);
        let later = now + Duration::seconds(5);
        meta.touch(ActorId::new(4), later);

        assert_eq!(meta.created_by, ActorId::new(3));
        assert_eq!(meta.updated_by, ActorId::new(4));
        assert_eq!(meta.created_at, now);
        assert_eq!(meta.updated_at, later);
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let now = Utc::now();
        let mut meta = AuditMetadata::new(ActorId::UNKNOWN, now);
        meta.touch(ActorId::new(1), now - Duration::seconds(10));
        assert_eq!(meta.updated_at, now);
    }

    #[test]
    fn test_fields_round_trip() {
        let meta = AuditMetadata::new(ActorId::new(8), Utc::now());
        let fields: HashMap<&str, FieldValue> = meta.to_fields().into_iter().collect();
        let rebuilt = AuditMetadata::from_fields(|name| fields.get(name)).unwrap();
        assert_eq!(rebuilt, meta);
    }

    #[test]
    fn test_same_metadata_value_ignores_storage_form() {
        let ts = DateTime::parse_from_rfc3339("2026-10-19T07:12:43.009448Z")
            .unwrap()
            .with_timezone(&Utc);
        let text = FieldValue::from("2026-10-19T07:12:43.009448Z");

        assert!(same_metadata_value(CREATED_AT_COLUMN, &text, &FieldValue::Timestamp(ts)));
        assert!(same_metadata_value(CREATED_BY_COLUMN, &FieldValue::Null, &FieldValue::Int(0)));
        assert!(!same_metadata_value(UPDATED_BY_COLUMN, &FieldValue::Null, &FieldValue::Int(4)));
        assert!(!same_metadata_value(
            UPDATED_AT_COLUMN,
            &text,
            &FieldValue::Timestamp(ts + Duration::seconds(1))
        ));
    }
}
