//! Audit record builder
//!
//! Packages an operation, the acting identity and either a full snapshot
//! (create/delete) or a change list (update) into an [`AuditEntry`].
//! Building never fails and has no side effects.

use serde_json::{Map, Value};

use super::changes::{detect_all_changes, FieldChange};
use super::encoding::{encode_snapshot, encode_value};
use super::entry::{AuditEntry, Operation};
use crate::actor::ActorId;
use crate::models::{Auditable, Snapshot};

/// Default label for entries describing entity writes
pub const DEFAULT_ENTITY_SOURCE: &str = "audit_trail.entity";

/// What an entry describes
#[derive(Debug, Clone, Copy)]
pub enum AuditPayload<'a> {
    /// All current field values of the entity
    Snapshot(&'a Snapshot),
    /// Fields changed by an update
    Changes(&'a [FieldChange]),
}

/// Builds entries stamped with a fixed source label
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    source: String,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ENTITY_SOURCE)
    }
}

impl RecordBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Build an entry for `action` performed by `actor`
    pub fn build_entry(
        &self,
        action: Operation,
        actor: ActorId,
        payload: AuditPayload<'_>,
    ) -> AuditEntry {
        let details = match payload {
            AuditPayload::Snapshot(snapshot) => encode_snapshot(snapshot),
            AuditPayload::Changes(changes) => changes_to_details(changes),
        };
        AuditEntry::new(actor, self.source.clone(), action.message(), details.to_string())
    }

    /// Entry for a freshly inserted entity
    pub fn for_create<E: Auditable + ?Sized>(&self, entity: &E, actor: ActorId) -> AuditEntry {
        let snapshot = entity.snapshot();
        self.build_entry(Operation::Create, actor, AuditPayload::Snapshot(&snapshot))
    }

    /// Entry for an updated entity, built from its pending change history
    pub fn for_update<E: Auditable + ?Sized>(&self, entity: &E, actor: ActorId) -> AuditEntry {
        let changes = detect_all_changes(entity);
        self.build_entry(Operation::Update, actor, AuditPayload::Changes(&changes))
    }

    /// Entry for a deleted entity
    pub fn for_delete<E: Auditable + ?Sized>(&self, entity: &E, actor: ActorId) -> AuditEntry {
        let snapshot = entity.snapshot();
        self.build_entry(Operation::Delete, actor, AuditPayload::Snapshot(&snapshot))
    }
}

/// Build an entry with the default entity source label
pub fn build_entry(action: Operation, actor: ActorId, payload: AuditPayload<'_>) -> AuditEntry {
    RecordBuilder::default().build_entry(action, actor, payload)
}

/// `{field: {"old_value": .., "new_value": ..}}` for a change list
pub fn changes_to_details(changes: &[FieldChange]) -> Value {
    let mut details = Map::new();
    for change in changes {
        let mut pair = Map::new();
        pair.insert("old_value".to_string(), encode_value(&change.old_value));
        pair.insert("new_value".to_string(), encode_value(&change.new_value));
        details.insert(change.field_name.clone(), Value::Object(pair));
    }
    Value::Object(details)
}
