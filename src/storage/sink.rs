//! Audit sink
//!
//! Appends entries to the log table on the caller's connection or
//! transaction. Two paths share the table:
//!
//! - `record`: structured entries built from entity writes.
//! - `mirror_statement`: a copy of every raw write statement, keyed on a
//!   keyword list, skipping statements that touch the log table itself.
//!
//! Insert failures are returned to the caller, which is expected to abort
//! the enclosing transaction.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use super::{format_timestamp, validate_identifier};
use crate::actor::ActorId;
use crate::audit::encoding::encode_params;
use crate::audit::{AuditEntry, Severity};
use crate::config::Settings;
use crate::error::{AuditError, AuditResult};
use crate::models::FieldValue;

/// Default log table name
pub const DEFAULT_TABLE: &str = "logs";

/// Default label for mirrored statements
pub const DEFAULT_STATEMENT_SOURCE: &str = "audit_trail.statement";

/// Statements containing one of these are mirrored
pub const DEFAULT_MIRROR_KEYWORDS: [&str; 5] = ["INSERT", "UPDATE", "CREATE", "DELETE", "ALTER"];

/// Writes audit rows into the log table
#[derive(Debug)]
pub struct AuditSink {
    table: String,
    statement_source: String,
    keywords: Vec<String>,
    /// Last `created_at` handed out, so timestamps never go backwards.
    /// Locked only so the sink is `Sync`; writes are serialized by the
    /// connection, so it is never contended.
    last_created_at: Mutex<Option<DateTime<Utc>>>,
}

impl AuditSink {
    /// Create a sink writing to `table`
    pub fn new(table: impl Into<String>) -> AuditResult<Self> {
        let table = table.into();
        validate_identifier(&table)?;

        Ok(Self {
            table,
            statement_source: DEFAULT_STATEMENT_SOURCE.to_string(),
            keywords: DEFAULT_MIRROR_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            last_created_at: Mutex::new(None),
        })
    }

    /// Create a sink from user settings
    pub fn from_settings(settings: &Settings) -> AuditResult<Self> {
        Ok(Self::new(settings.table_name.clone())?
            .with_statement_source(settings.statement_source.clone())
            .with_keywords(settings.mirror_keywords.clone()))
    }

    pub fn with_statement_source(mut self, source: impl Into<String>) -> Self {
        self.statement_source = source.into();
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn next_timestamp(&self) -> AuditResult<DateTime<Utc>> {
        let mut last = self
            .last_created_at
            .lock()
            .map_err(|e| AuditError::Storage(format!("Failed to acquire sink clock: {}", e)))?;

        let now = Utc::now();
        let ts = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(ts);
        Ok(ts)
    }

    /// Append an entry; returns the new row id
    pub fn record(&self, conn: &Connection, entry: &AuditEntry) -> AuditResult<i64> {
        let created_at = self.next_timestamp()?;

        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, logger, level, trace, msg, args, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                self.table
            ),
            params![
                entry.actor_id,
                entry.source,
                entry.severity.as_str(),
                entry.trace,
                entry.message,
                entry.details,
                format_timestamp(&created_at),
            ],
        )
        .map_err(|e| AuditError::Storage(format!("Failed to insert audit entry: {}", e)))?;

        let id = conn.last_insert_rowid();

        debug!(
            audit_id = id,
            source = %entry.source,
            message = %entry.message,
            actor = ?entry.actor_id,
            "Recorded audit entry"
        );

        Ok(id)
    }

    /// Whether a raw statement should be copied into the log
    ///
    /// Matching is a plain substring check, so keyword case matters and any
    /// statement mentioning the log table name is skipped.
    pub fn should_mirror(&self, statement: &str) -> bool {
        self.keywords.iter().any(|k| statement.contains(k.as_str()))
            && !statement.contains(self.table.as_str())
    }

    /// Copy an executed write statement into the log
    ///
    /// Returns the id of the mirror row, or `None` when the statement was
    /// filtered out.
    pub fn mirror_statement(
        &self,
        conn: &Connection,
        statement: &str,
        params: &[FieldValue],
        actor: ActorId,
    ) -> AuditResult<Option<i64>> {
        if !self.should_mirror(statement) {
            debug!(statement, "Skipping statement mirror");
            return Ok(None);
        }

        let entry = AuditEntry::new(
            actor,
            self.statement_source.clone(),
            statement,
            encode_params(params).to_string(),
        )
        .with_severity(Severity::Info);

        self.record(conn, &entry).map(Some)
    }
}
