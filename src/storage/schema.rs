//! SQLite schema for the audit log table

use rusqlite::Connection;

use super::validate_identifier;
use crate::error::AuditResult;

/// Create the log table and its indexes if they don't exist
pub fn init_schema(conn: &Connection, table: &str) -> AuditResult<()> {
    validate_identifier(table)?;

    conn.execute(
        &format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                logger TEXT,
                level TEXT,
                trace TEXT,
                msg TEXT,
                args TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        ),
        [],
    )?;

    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table}(created_at)"),
        [],
    )?;

    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS idx_{table}_user_id ON {table}(user_id)"),
        [],
    )?;

    Ok(())
}
