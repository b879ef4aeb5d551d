//! Audited session
//!
//! A unit of work over one SQLite transaction. Every write goes through the
//! session, which fires the registered lifecycle hooks on the same
//! transaction. Audit rows therefore commit or roll back together with the
//! writes they describe; dropping the session without `commit` discards
//! both.

use chrono::Utc;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use crate::actor::ActorId;
use crate::error::{AuditError, AuditResult};
use crate::hooks::HookRegistry;
use crate::models::{FieldValue, TrackedRecord, ID_COLUMN};
use crate::storage::validate_identifier;

/// Transaction that audits its writes
pub struct AuditSession<'conn> {
    tx: Transaction<'conn>,
    hooks: HookRegistry,
    actor: ActorId,
}

impl<'conn> AuditSession<'conn> {
    /// Open a transaction attributed to `actor`
    pub fn begin(
        conn: &'conn mut Connection,
        hooks: HookRegistry,
        actor: ActorId,
    ) -> AuditResult<Self> {
        let tx = conn.transaction()?;
        debug!(%actor, hooks = hooks.len(), "Began audited session");
        Ok(Self { tx, hooks, actor })
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// The underlying transaction, for reads
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    fn run(&self, sql: &str, params: &[FieldValue]) -> AuditResult<(usize, i64)> {
        let failed = |e: rusqlite::Error| AuditError::Storage(format!("Statement failed: {}", e));

        let mut stmt = self.tx.prepare(sql).map_err(failed)?;
        let affected = if stmt.column_count() > 0 {
            // Row-returning statements are stepped to completion
            let mut rows = stmt.query(params_from_iter(params.iter())).map_err(failed)?;
            let mut count = 0;
            while rows.next().map_err(failed)?.is_some() {
                count += 1;
            }
            count
        } else {
            stmt.execute(params_from_iter(params.iter())).map_err(failed)?
        };

        Ok((affected, self.tx.last_insert_rowid()))
    }

    /// Execute a raw statement
    ///
    /// Returns the number of affected rows, or of returned rows for queries.
    pub fn execute(&self, sql: &str, params: &[FieldValue]) -> AuditResult<usize> {
        let (affected, _) = self.run(sql, params)?;
        self.hooks.fire_execute(&self.tx, sql, params, self.actor)?;
        Ok(affected)
    }

    /// Load a row into a tracked record
    pub fn fetch(&self, table: &str, id: i64, columns: &[&str]) -> AuditResult<TrackedRecord> {
        validate_identifier(table)?;
        for column in columns {
            validate_identifier(column)?;
        }

        let sql = if columns.is_empty() {
            format!("SELECT {} FROM {} WHERE {} = ?1", ID_COLUMN, table, ID_COLUMN)
        } else {
            format!(
                "SELECT {}, {} FROM {} WHERE {} = ?1",
                ID_COLUMN,
                columns.join(", "),
                table,
                ID_COLUMN
            )
        };

        let values = self
            .tx
            .query_row(&sql, [id], |row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        Ok((column.to_string(), FieldValue::from_sql_ref(row.get_ref(i + 1)?)))
                    })
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .optional()?
            .ok_or_else(|| record_not_found(table, id))?;

        TrackedRecord::loaded(table, id, columns.iter().copied(), values)
    }

    /// Insert a new record and fire `after_insert`
    ///
    /// Audit metadata is stamped first when the record declares the audit
    /// columns. Returns the new row id.
    pub fn insert(&self, record: &mut TrackedRecord) -> AuditResult<i64> {
        if let Some(id) = record.id() {
            return Err(AuditError::Validation(format!(
                "{} #{} is already persisted",
                record.table(),
                id
            )));
        }

        if record.has_audit_columns() {
            record.stamp_created(self.actor, Utc::now())?;
        }

        let (columns, params): (Vec<String>, Vec<FieldValue>) = record
            .assigned_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .unzip();

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", record.table())
        } else {
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                record.table(),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        // The row id has to be read before hooks write audit rows
        let (_, id) = self.run(&sql, &params)?;
        self.hooks.fire_execute(&self.tx, &sql, &params, self.actor)?;

        record.set_id(id);
        self.hooks.fire_insert(&self.tx, &*record, self.actor)?;
        record.mark_persisted();

        debug!(table = record.table(), id, "Inserted audited record");
        Ok(id)
    }

    /// Flush pending changes and fire `after_update`
    ///
    /// Returns `false` without touching the database when nothing changed.
    pub fn update(&self, record: &mut TrackedRecord) -> AuditResult<bool> {
        let id = record.id().ok_or_else(|| {
            AuditError::Validation(format!("{} record has no id", record.table()))
        })?;

        if !record.is_dirty() {
            debug!(table = record.table(), id, "No changes to flush");
            return Ok(false);
        }

        if record.has_audit_columns() {
            record.stamp_updated(self.actor, Utc::now())?;
        }

        let dirty: Vec<String> = record
            .dirty_fields()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut params = Vec::with_capacity(dirty.len() + 1);
        let mut assignments = Vec::with_capacity(dirty.len());
        for (i, field) in dirty.iter().enumerate() {
            assignments.push(format!("{} = ?{}", field, i + 1));
            params.push(record.get(field).cloned().unwrap_or(FieldValue::Null));
        }
        params.push(FieldValue::Int(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            record.table(),
            assignments.join(", "),
            ID_COLUMN,
            params.len()
        );

        let (affected, _) = self.run(&sql, &params)?;
        if affected == 0 {
            return Err(record_not_found(record.table(), id));
        }
        self.hooks.fire_execute(&self.tx, &sql, &params, self.actor)?;

        // Hooks read the change history, so it is folded in afterwards
        self.hooks.fire_update(&self.tx, &*record, self.actor)?;
        record.mark_persisted();

        debug!(table = record.table(), id, fields = dirty.len(), "Updated audited record");
        Ok(true)
    }

    /// Delete a persisted record and fire `after_delete`
    pub fn delete(&self, record: &TrackedRecord) -> AuditResult<()> {
        let id = record.id().ok_or_else(|| {
            AuditError::Validation(format!("{} record has no id", record.table()))
        })?;

        let sql = format!("DELETE FROM {} WHERE {} = ?1", record.table(), ID_COLUMN);
        let params = [FieldValue::Int(id)];

        let (affected, _) = self.run(&sql, &params)?;
        if affected == 0 {
            return Err(record_not_found(record.table(), id));
        }
        self.hooks.fire_execute(&self.tx, &sql, &params, self.actor)?;
        self.hooks.fire_delete(&self.tx, record, self.actor)?;

        debug!(table = record.table(), id, "Deleted audited record");
        Ok(())
    }

    /// Commit the business writes and their audit rows
    pub fn commit(self) -> AuditResult<()> {
        self.tx
            .commit()
            .map_err(|e| AuditError::Storage(format!("Failed to commit: {}", e)))?;
        info!(actor = %self.actor, "Committed audited session");
        Ok(())
    }

    /// Discard the business writes and their audit rows
    pub fn rollback(self) -> AuditResult<()> {
        self.tx.rollback()?;
        info!(actor = %self.actor, "Rolled back audited session");
        Ok(())
    }
}

fn record_not_found(table: &str, id: i64) -> AuditError {
    AuditError::NotFound {
        entity_type: "Record",
        identifier: format!("{} #{}", table, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::hooks::AuditListener;
    use crate::storage::{init_schema, query_entries, AuditSink, LogQuery};
    use crate::audit::RecordBuilder;
    use crate::models::AUDIT_COLUMNS;
    use serde_json::json;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, "logs").unwrap();
        conn.execute(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                age INTEGER,
                created_by_id INTEGER,
                updated_by_id INTEGER,
                created_at TEXT,
                updated_at TEXT
            )",
            [],
        )
        .unwrap();
        conn
    }

    fn registry(mirror: bool) -> HookRegistry {
        let mut registry = HookRegistry::new();
        registry.register(
            AuditListener::from_settings(&Settings::default())
                .unwrap()
                .with_statement_mirroring(mirror),
        );
        registry
    }

    fn alice() -> TrackedRecord {
        let mut record = TrackedRecord::new("users", ["name", "age"]).unwrap();
        record.set("name", "Alice").unwrap();
        record.set("age", 30).unwrap();
        record
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get(0)
        })
        .unwrap()
    }

    #[test]
    fn test_insert_records_create_entry() {
        let mut conn = setup();
        let session = AuditSession::begin(&mut conn, registry(false), ActorId::new(7)).unwrap();

        let mut record = alice();
        let id = session.insert(&mut record).unwrap();
        assert_eq!(record.id(), Some(id));
        assert!(!record.is_dirty());
        session.commit().unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Create object");
        assert_eq!(entries[0].actor_id, Some(7));
        assert_eq!(
            entries[0].details_json().unwrap(),
            json!({"id": id, "name": "Alice", "age": 30})
        );
    }

    #[test]
    fn test_insert_with_mirroring() {
        let mut conn = setup();
        let session = AuditSession::begin(&mut conn, registry(true), ActorId::new(7)).unwrap();
        let id = session.insert(&mut alice()).unwrap();
        session.commit().unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "Create object");
        assert!(entries[1].message.starts_with("INSERT INTO users"));
        assert_eq!(entries[1].details, r#"["Alice",30]"#);

        // The row id is the user's, not the audit row's
        let name: String = conn
            .query_row("SELECT name FROM users WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "Alice");
    }

    #[test]
    fn test_update_records_changes() {
        let mut conn = setup();
        conn.execute("INSERT INTO users (name, age) VALUES ('Alice', 30)", [])
            .unwrap();

        let session = AuditSession::begin(&mut conn, registry(false), ActorId::new(2)).unwrap();
        let mut record = session.fetch("users", 1, &["name", "age"]).unwrap();
        record.set("age", 31).unwrap();
        assert!(session.update(&mut record).unwrap());
        session.commit().unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Update object");
        assert_eq!(
            entries[0].details_json().unwrap(),
            json!({"age": {"old_value": 30, "new_value": 31}})
        );

        let age: i64 = conn
            .query_row("SELECT age FROM users WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(age, 31);
    }

    #[test]
    fn test_update_without_changes_is_noop() {
        let mut conn = setup();
        conn.execute("INSERT INTO users (name, age) VALUES ('Alice', 30)", [])
            .unwrap();

        let session = AuditSession::begin(&mut conn, registry(true), ActorId::new(2)).unwrap();
        let mut record = session.fetch("users", 1, &["name", "age"]).unwrap();
        record.set("age", 30).unwrap();
        assert!(!session.update(&mut record).unwrap());
        session.commit().unwrap();

        assert_eq!(count(&conn, "logs"), 0);
    }

    #[test]
    fn test_delete_records_snapshot() {
        let mut conn = setup();
        conn.execute("INSERT INTO users (name, age) VALUES ('Bob', 40)", [])
            .unwrap();

        let session = AuditSession::begin(&mut conn, registry(false), ActorId::UNKNOWN).unwrap();
        let record = session.fetch("users", 1, &["name", "age"]).unwrap();
        session.delete(&record).unwrap();
        session.commit().unwrap();

        assert_eq!(count(&conn, "users"), 0);
        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries[0].message, "Delete object");
        assert_eq!(entries[0].actor_id, Some(0));
        assert_eq!(
            entries[0].details_json().unwrap(),
            json!({"id": 1, "name": "Bob", "age": 40})
        );
    }

    #[test]
    fn test_fetch_missing_row() {
        let mut conn = setup();
        let session = AuditSession::begin(&mut conn, registry(false), ActorId::UNKNOWN).unwrap();
        let err = session.fetch("users", 99, &["name"]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rollback_discards_business_and_audit_rows() {
        let mut conn = setup();
        let session = AuditSession::begin(&mut conn, registry(true), ActorId::new(1)).unwrap();
        session.insert(&mut alice()).unwrap();
        session.rollback().unwrap();

        assert_eq!(count(&conn, "users"), 0);
        assert_eq!(count(&conn, "logs"), 0);
    }

    #[test]
    fn test_drop_without_commit_discards() {
        let mut conn = setup();
        {
            let session =
                AuditSession::begin(&mut conn, registry(true), ActorId::new(1)).unwrap();
            session.insert(&mut alice()).unwrap();
        }

        assert_eq!(count(&conn, "users"), 0);
        assert_eq!(count(&conn, "logs"), 0);
    }

    #[test]
    fn test_failed_audit_insert_aborts_write() {
        let mut conn = setup();
        let mut hooks = HookRegistry::new();
        hooks.register(AuditListener::new(
            RecordBuilder::default(),
            AuditSink::new("missing_logs").unwrap(),
        ));

        {
            let session = AuditSession::begin(&mut conn, hooks, ActorId::new(1)).unwrap();
            let err = session.insert(&mut alice()).unwrap_err();
            assert!(err.is_storage());
        }

        assert_eq!(count(&conn, "users"), 0);
    }

    #[test]
    fn test_audit_metadata_stamped() {
        let mut conn = setup();
        let session = AuditSession::begin(&mut conn, registry(false), ActorId::new(5)).unwrap();

        let mut record = alice().with_audit_columns();
        let id = session.insert(&mut record).unwrap();
        session.commit().unwrap();

        let (created_by, updated_by): (i64, i64) = conn
            .query_row(
                "SELECT created_by_id, updated_by_id FROM users WHERE id = ?1",
                [id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(created_by, 5);
        assert_eq!(updated_by, 5);

        let session = AuditSession::begin(&mut conn, registry(false), ActorId::new(6)).unwrap();
        record.set("name", "Alicia").unwrap();
        session.update(&mut record).unwrap();
        session.commit().unwrap();

        let (created_by, updated_by): (i64, i64) = conn
            .query_row(
                "SELECT created_by_id, updated_by_id FROM users WHERE id = ?1",
                [id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(created_by, 5);
        assert_eq!(updated_by, 6);
    }

    #[test]
    fn test_update_of_fetched_row_logs_only_changed_fields() {
        let mut conn = setup();
        let session = AuditSession::begin(&mut conn, registry(false), ActorId::new(5)).unwrap();
        let id = session.insert(&mut alice().with_audit_columns()).unwrap();
        session.commit().unwrap();

        let columns: Vec<&str> = std::iter::once("name").chain(AUDIT_COLUMNS).collect();
        let session = AuditSession::begin(&mut conn, registry(false), ActorId::new(6)).unwrap();
        let mut record = session.fetch("users", id, &columns).unwrap();
        record.set("name", "Alicia").unwrap();
        assert!(session.update(&mut record).unwrap());
        session.commit().unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries[0].message, "Update object");
        let details = entries[0].details_json().unwrap();
        let mut keys: Vec<&str> = details
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["name", "updated_at", "updated_by_id"]);
        assert_eq!(details["updated_by_id"], json!({"old_value": 5, "new_value": 6}));
    }

    #[test]
    fn test_execute_mirrors_writes_only() {
        let mut conn = setup();
        let session = AuditSession::begin(&mut conn, registry(true), ActorId::new(3)).unwrap();

        session
            .execute(
                "INSERT INTO users (name) VALUES (?1)",
                &[FieldValue::from("Carol")],
            )
            .unwrap();
        session.execute("DELETE FROM logs", &[]).unwrap();
        session
            .execute("UPDATE users SET age = ?1", &[FieldValue::Int(20)])
            .unwrap();
        session.commit().unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "UPDATE users SET age = ?1");
        assert_eq!(entries[0].actor_id, Some(3));
    }
}
