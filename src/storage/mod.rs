//! Storage layer for audit-trail
//!
//! The log table lives in SQLite. Entries are written on the caller's
//! connection, so an audit insert commits or rolls back together with the
//! write it documents.

pub mod query;
pub mod schema;
pub mod sink;

pub use query::{
    count_entries, get_entry, query_all_entries, query_entries, LogQuery, DEFAULT_QUERY_LIMIT,
    MAX_QUERY_LIMIT,
};
pub use schema::init_schema;
pub use sink::{AuditSink, DEFAULT_MIRROR_KEYWORDS, DEFAULT_STATEMENT_SOURCE, DEFAULT_TABLE};

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::{AuditError, AuditResult};

/// Check that `name` can be interpolated into SQL as a table or column name
pub fn validate_identifier(name: &str) -> AuditResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AuditError::Validation(format!(
            "Invalid SQL identifier: '{}'",
            name
        )))
    }
}

/// Open (creating if needed) the database file and make sure the log table
/// exists
pub fn open_database(path: &Path, table: &str) -> AuditResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AuditError::Io(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let conn = Connection::open(path)
        .map_err(|e| AuditError::Storage(format!("Failed to open audit database: {}", e)))?;
    init_schema(&conn, table)?;
    Ok(conn)
}

/// Format a timestamp the way the sink stores it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
///
/// Accepts RFC 3339 (written by the sink) and SQLite's `CURRENT_TIMESTAMP`
/// format (rows inserted by other writers relying on the column default).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
