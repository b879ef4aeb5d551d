//! Generic tracked record
//!
//! A row of a business table held in memory together with its change
//! history. The audited session flushes it with INSERT/UPDATE/DELETE and
//! hands it to the lifecycle hooks, which read history and snapshots through
//! the [`Auditable`] trait.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::entity::{Auditable, FieldHistory, Snapshot};
use super::metadata::{same_metadata_value, AuditMetadata, AUDIT_COLUMNS};
use super::value::FieldValue;
use crate::actor::ActorId;
use crate::error::{AuditError, AuditResult};
use crate::storage::validate_identifier;

/// Name of the primary key column
pub const ID_COLUMN: &str = "id";

/// A row with pending, not yet persisted, changes
#[derive(Debug, Clone)]
pub struct TrackedRecord {
    table: String,
    id: Option<i64>,
    columns: Vec<String>,
    committed: BTreeMap<String, FieldValue>,
    pending: BTreeMap<String, FieldValue>,
}

impl TrackedRecord {
    /// Create a new, not yet persisted record
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> AuditResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        validate_identifier(&table)?;

        let mut record = Self {
            table,
            id: None,
            columns: Vec::new(),
            committed: BTreeMap::new(),
            pending: BTreeMap::new(),
        };
        for column in columns {
            record.add_column(column.into())?;
        }
        Ok(record)
    }

    /// Create a record for an existing row with the given stored values
    pub fn loaded<I, S>(
        table: impl Into<String>,
        id: i64,
        columns: I,
        values: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> AuditResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut record = Self::new(table, columns)?;
        record.id = Some(id);
        for (name, value) in values {
            record.ensure_column(&name)?;
            record.committed.insert(name, value);
        }
        Ok(record)
    }

    /// Add the created_by/updated_by/created_at/updated_at columns
    pub fn with_audit_columns(mut self) -> Self {
        for column in AUDIT_COLUMNS {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
        self
    }

    fn add_column(&mut self, column: String) -> AuditResult<()> {
        validate_identifier(&column)?;
        if column == ID_COLUMN {
            return Err(AuditError::Validation(
                "The id column is managed by the record".into(),
            ));
        }
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
        Ok(())
    }

    fn ensure_column(&self, name: &str) -> AuditResult<()> {
        if self.columns.iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(AuditError::Validation(format!(
                "Unknown column '{}' on {}",
                name, self.table
            )))
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    /// Declared columns, excluding the primary key
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Assign a value; the change stays pending until the record is flushed
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> AuditResult<()> {
        self.ensure_column(field)?;
        self.pending.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Current value of a field, pending changes first
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.pending
            .get(field)
            .or_else(|| self.committed.get(field))
    }

    /// Fields with pending changes, in declaration order
    pub fn dirty_fields(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| self.history(c).has_changes())
            .map(String::as_str)
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_fields().is_empty()
    }

    /// Fields holding a value, in declaration order
    pub fn assigned_fields(&self) -> Vec<(&str, &FieldValue)> {
        self.columns
            .iter()
            .filter_map(|c| self.get(c).map(|v| (c.as_str(), v)))
            .collect()
    }

    /// Fold pending changes into the committed state
    pub fn mark_persisted(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.committed.extend(pending);
    }

    pub fn has_audit_columns(&self) -> bool {
        AUDIT_COLUMNS
            .iter()
            .all(|column| self.columns.iter().any(|c| c == column))
    }

    /// Fill audit metadata for an insert
    pub fn stamp_created(&mut self, actor: ActorId, now: DateTime<Utc>) -> AuditResult<()> {
        let meta = AuditMetadata::new(actor, now);
        self.apply_metadata(&meta)
    }

    /// Refresh audit metadata for an update
    pub fn stamp_updated(&mut self, actor: ActorId, now: DateTime<Utc>) -> AuditResult<()> {
        let meta = match self.audit_metadata() {
            Some(mut meta) => {
                meta.touch(actor, now);
                meta
            }
            None => AuditMetadata::new(actor, now),
        };
        self.apply_metadata(&meta)
    }

    fn apply_metadata(&mut self, meta: &AuditMetadata) -> AuditResult<()> {
        for (column, value) in meta.to_fields() {
            let current = self
                .get(column)
                .is_some_and(|stored| same_metadata_value(column, stored, &value));
            if !current {
                self.set(column, value)?;
            }
        }
        Ok(())
    }

    /// Audit metadata currently held by the record
    pub fn audit_metadata(&self) -> Option<AuditMetadata> {
        AuditMetadata::from_fields(|name| self.get(name))
    }
}

impl Auditable for TrackedRecord {
    fn entity_name(&self) -> &str {
        &self.table
    }

    fn field_names(&self) -> Vec<String> {
        std::iter::once(ID_COLUMN.to_string())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    fn history(&self, field: &str) -> FieldHistory {
        if field == ID_COLUMN {
            return self
                .id
                .map(|id| FieldHistory::unchanged(FieldValue::Int(id)))
                .unwrap_or_default();
        }

        let committed = self.committed.get(field);
        match (self.pending.get(field), committed) {
            (Some(new), Some(old)) if new == old => FieldHistory::unchanged(old.clone()),
            (Some(new), old) => FieldHistory::changed(old.cloned(), new.clone()),
            (None, Some(old)) => FieldHistory::unchanged(old.clone()),
            (None, None) => FieldHistory::default(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        if let Some(id) = self.id {
            snapshot.insert(ID_COLUMN.to_string(), FieldValue::Int(id));
        }
        for (name, value) in self.assigned_fields() {
            snapshot.insert(name.to_string(), value.clone());
        }
        snapshot
    }
}
