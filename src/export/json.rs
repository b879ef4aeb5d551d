//! JSON Export functionality
//!
//! Exports log entries with schema versioning.

use std::collections::BTreeSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::error::{AuditError, AuditResult};
use crate::storage::{query_all_entries, LogQuery};

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Exported log entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    /// Log table the entries came from
    pub table: String,

    /// Entries, newest first
    pub entries: Vec<AuditEntry>,

    pub metadata: ExportMetadata,
}

/// Summary of the exported entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub entry_count: usize,

    /// Distinct actors, the unknown actor included
    pub actor_count: usize,

    pub earliest_entry: Option<DateTime<Utc>>,

    pub latest_entry: Option<DateTime<Utc>>,
}

impl ExportMetadata {
    fn from_entries(entries: &[AuditEntry]) -> Self {
        let actors: BTreeSet<_> = entries.iter().map(|e| e.actor()).collect();
        Self {
            entry_count: entries.len(),
            actor_count: actors.len(),
            earliest_entry: entries.iter().filter_map(|e| e.created_at).min(),
            latest_entry: entries.iter().filter_map(|e| e.created_at).max(),
        }
    }
}

impl LogExport {
    pub fn new(table: impl Into<String>, entries: Vec<AuditEntry>) -> Self {
        let metadata = ExportMetadata::from_entries(&entries);
        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            table: table.into(),
            entries,
            metadata,
        }
    }

    /// Export every entry matching the filters of `query`; paging is ignored
    pub fn from_query(conn: &Connection, table: &str, query: &LogQuery) -> AuditResult<Self> {
        let entries = query_all_entries(conn, table, query)?;
        Ok(Self::new(table, entries))
    }

    /// Validate the export structure
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        if self.metadata.entry_count != self.entries.len() {
            return Err(format!(
                "Entry count mismatch: metadata says {}, found {}",
                self.metadata.entry_count,
                self.entries.len()
            ));
        }

        let mut seen = BTreeSet::new();
        for id in self.entries.iter().filter_map(|e| e.id) {
            if !seen.insert(id) {
                return Err(format!("Duplicate log entry {}", id));
            }
        }

        Ok(())
    }
}

/// Write an export as JSON
pub fn export_logs_json<W: Write>(export: &LogExport, writer: W, pretty: bool) -> AuditResult<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, export)
    } else {
        serde_json::to_writer(writer, export)
    }
    .map_err(|e| AuditError::Export(e.to_string()))?;

    Ok(())
}

/// Read back a JSON export
pub fn import_from_json(json_str: &str) -> AuditResult<LogExport> {
    let export: LogExport =
        serde_json::from_str(json_str).map_err(|e| AuditError::Export(e.to_string()))?;

    export.validate().map_err(AuditError::Export)?;

    Ok(export)
}
