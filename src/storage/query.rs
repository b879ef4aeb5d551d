//! Read-side queries over the log table

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{format_timestamp, parse_timestamp, validate_identifier};
use crate::audit::{AuditEntry, Severity};
use crate::error::{AuditError, AuditResult};

/// Default page size for log queries
pub const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Upper bound on a single page
pub const MAX_QUERY_LIMIT: i64 = 1000;

const ENTRY_COLUMNS: &str = "id, user_id, logger, level, trace, msg, args, created_at";

/// Filters for listing log entries
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub actor_id: Option<i64>,
    pub source: Option<String>,
    pub severity: Option<Severity>,
    /// Inclusive lower bound on `created_at`
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            actor_id: None,
            source: None,
            severity: None,
            since: None,
            until: None,
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
        }
    }
}

impl LogQuery {
    pub fn actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Page size clamped to `1..=MAX_QUERY_LIMIT`
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_QUERY_LIMIT)
    }

    /// Build the WHERE clause and its bound values
    fn conditions(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(actor_id) = self.actor_id {
            conditions.push("user_id = ?");
            values.push(Value::Integer(actor_id));
        }
        if let Some(source) = &self.source {
            conditions.push("logger = ?");
            values.push(Value::Text(source.clone()));
        }
        if let Some(severity) = self.severity {
            conditions.push("level = ?");
            values.push(Value::Text(severity.as_str().to_string()));
        }
        if let Some(since) = &self.since {
            conditions.push("julianday(created_at) >= julianday(?)");
            values.push(Value::Text(format_timestamp(since)));
        }
        if let Some(until) = &self.until {
            conditions.push("julianday(created_at) <= julianday(?)");
            values.push(Value::Text(format_timestamp(until)));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        (clause, values)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let level: Option<String> = row.get(3)?;
    let created_at: Option<String> = row.get(7)?;

    Ok(AuditEntry {
        id: Some(row.get(0)?),
        actor_id: row.get(1)?,
        source: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        severity: level
            .and_then(|l| l.parse().ok())
            .unwrap_or_default(),
        trace: row.get(4)?,
        message: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        details: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        created_at: created_at.as_deref().and_then(parse_timestamp),
    })
}

/// List entries matching `query`, newest first
pub fn query_entries(
    conn: &Connection,
    table: &str,
    query: &LogQuery,
) -> AuditResult<Vec<AuditEntry>> {
    validate_identifier(table)?;

    let (clause, mut values) = query.conditions();
    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY id DESC LIMIT ? OFFSET ?",
        ENTRY_COLUMNS, table, clause
    );
    values.push(Value::Integer(query.effective_limit()));
    values.push(Value::Integer(query.offset.max(0)));

    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params_from_iter(values), row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = entries.len(), "Queried audit log");

    Ok(entries)
}

/// List every entry matching the filters of `query`, newest first
///
/// Paging is ignored. Rows are read in pages of [`MAX_QUERY_LIMIT`], each
/// page continuing below the last id seen.
pub fn query_all_entries(
    conn: &Connection,
    table: &str,
    query: &LogQuery,
) -> AuditResult<Vec<AuditEntry>> {
    validate_identifier(table)?;

    let (clause, values) = query.conditions();
    let first_sql = format!(
        "SELECT {} FROM {}{} ORDER BY id DESC LIMIT ?",
        ENTRY_COLUMNS, table, clause
    );
    let next_sql = format!(
        "SELECT {} FROM {}{} {} id < ? ORDER BY id DESC LIMIT ?",
        ENTRY_COLUMNS,
        table,
        clause,
        if clause.is_empty() { "WHERE" } else { "AND" }
    );

    let mut entries: Vec<AuditEntry> = Vec::new();
    loop {
        let mut page_values = values.clone();
        let sql = match entries.last().and_then(|e| e.id) {
            Some(last_id) => {
                page_values.push(Value::Integer(last_id));
                &next_sql
            }
            None => &first_sql,
        };
        page_values.push(Value::Integer(MAX_QUERY_LIMIT));

        let mut stmt = conn.prepare_cached(sql)?;
        let page = stmt
            .query_map(params_from_iter(page_values), row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        let full = page.len() as i64 == MAX_QUERY_LIMIT;
        entries.extend(page);
        if !full {
            break;
        }
    }

    debug!(count = entries.len(), "Read full audit log");

    Ok(entries)
}

/// Fetch a single entry by id
pub fn get_entry(conn: &Connection, table: &str, id: i64) -> AuditResult<AuditEntry> {
    validate_identifier(table)?;

    conn.query_row(
        &format!("SELECT {} FROM {} WHERE id = ?1", ENTRY_COLUMNS, table),
        [id],
        row_to_entry,
    )
    .optional()?
    .ok_or_else(|| AuditError::entry_not_found(id.to_string()))
}

/// Count entries matching the filters of `query` (paging is ignored)
pub fn count_entries(conn: &Connection, table: &str, query: &LogQuery) -> AuditResult<i64> {
    validate_identifier(table)?;

    let (clause, values) = query.conditions();
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}{}", table, clause),
        params_from_iter(values),
        |row| row.get(0),
    )?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;
    use crate::storage::{init_schema, AuditSink};
    use chrono::Duration;

    fn setup() -> (Connection, AuditSink) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, "logs").unwrap();
        (conn, AuditSink::new("logs").unwrap())
    }

    fn seed(conn: &Connection, sink: &AuditSink) {
        sink.record(conn, &AuditEntry::new(ActorId::new(1), "app.entity", "Create object", "{}"))
            .unwrap();
        sink.record(conn, &AuditEntry::new(ActorId::new(2), "app.entity", "Update object", "{}"))
            .unwrap();
        sink.record(
            conn,
            &AuditEntry::new(ActorId::new(1), "app.statement", "DELETE FROM t", "[]")
                .with_severity(Severity::Debug),
        )
        .unwrap();
    }

    #[test]
    fn test_query_newest_first() {
        let (conn, sink) = setup();
        seed(&conn, &sink);

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "DELETE FROM t");
        assert_eq!(entries[2].message, "Create object");
        assert!(entries.iter().all(|e| e.id.is_some() && e.created_at.is_some()));
    }

    #[test]
    fn test_query_filters() {
        let (conn, sink) = setup();
        seed(&conn, &sink);

        let by_actor = query_entries(&conn, "logs", &LogQuery::default().actor(1)).unwrap();
        assert_eq!(by_actor.len(), 2);

        let by_source =
            query_entries(&conn, "logs", &LogQuery::default().source("app.statement")).unwrap();
        assert_eq!(by_source.len(), 1);

        let by_severity =
            query_entries(&conn, "logs", &LogQuery::default().severity(Severity::Debug)).unwrap();
        assert_eq!(by_severity.len(), 1);
        assert_eq!(by_severity[0].severity, Severity::Debug);
    }

    #[test]
    fn test_time_window() {
        let (conn, sink) = setup();
        seed(&conn, &sink);

        let future = Utc::now() + Duration::hours(1);
        let past = Utc::now() - Duration::hours(1);

        assert_eq!(
            count_entries(&conn, "logs", &LogQuery::default().since(future)).unwrap(),
            0
        );
        assert_eq!(
            count_entries(&conn, "logs", &LogQuery::default().since(past).until(future)).unwrap(),
            3
        );
    }

    #[test]
    fn test_limit_and_offset() {
        let (conn, sink) = setup();
        seed(&conn, &sink);

        let page = query_entries(&conn, "logs", &LogQuery::default().limit(1).offset(1)).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].message, "Update object");

        assert_eq!(LogQuery::default().limit(5000).effective_limit(), MAX_QUERY_LIMIT);
        assert_eq!(LogQuery::default().limit(0).effective_limit(), 1);
    }

    #[test]
    fn test_query_all_reads_past_page_limit() {
        let (conn, sink) = setup();
        for i in 0..1500 {
            let actor = ActorId::new(i % 2);
            sink.record(&conn, &AuditEntry::new(actor, "app.entity", "Create object", "{}"))
                .unwrap();
        }

        let query = LogQuery::default().limit(10).offset(20);
        let all = query_all_entries(&conn, "logs", &query).unwrap();
        assert_eq!(all.len(), 1500);
        assert!(all.windows(2).all(|w| w[0].id > w[1].id));

        let odd = query_all_entries(&conn, "logs", &LogQuery::default().actor(1)).unwrap();
        assert_eq!(odd.len(), 750);
        assert!(odd.iter().all(|e| e.actor_id == Some(1)));
    }

    #[test]
    fn test_get_entry() {
        let (conn, sink) = setup();
        let id = sink
            .record(&conn, &AuditEntry::new(ActorId::new(9), "app", "hello", r#"{"a":1}"#))
            .unwrap();

        let entry = get_entry(&conn, "logs", id).unwrap();
        assert_eq!(entry.id, Some(id));
        assert_eq!(entry.actor_id, Some(9));
        assert_eq!(entry.details, r#"{"a":1}"#);

        let err = get_entry(&conn, "logs", id + 100).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_reads_rows_from_other_writers() {
        let (conn, _sink) = setup();
        conn.execute("INSERT INTO logs (msg) VALUES ('external')", [])
            .unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor_id, None);
        assert_eq!(entries[0].actor(), ActorId::UNKNOWN);
        assert_eq!(entries[0].severity, Severity::Info);
        assert!(entries[0].created_at.is_some());
    }
}
