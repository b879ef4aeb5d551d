//! Log CLI commands
//!
//! Lists, shows and counts entries of the log table.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use rusqlite::Connection;

use crate::audit::Severity;
use crate::config::Settings;
use crate::display::{format_log_details, format_log_list};
use crate::error::{AuditError, AuditResult};
use crate::storage::{count_entries, get_entry, query_entries, LogQuery, DEFAULT_QUERY_LIMIT};

/// Filters shared by the log and export commands
#[derive(Args, Debug, Clone)]
pub struct LogFilterArgs {
    /// Only entries attributed to this actor id (0 = unknown)
    #[arg(short, long)]
    pub actor: Option<i64>,

    /// Only entries with this source label
    #[arg(short, long)]
    pub source: Option<String>,

    /// Only entries with this level (info, debug, error)
    #[arg(short, long)]
    pub level: Option<Severity>,

    /// Entries created at or after this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Entries created at or before this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,
}

/// Paging of the list command
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// Maximum number of entries
    #[arg(short = 'n', long, default_value_t = DEFAULT_QUERY_LIMIT)]
    pub limit: i64,

    /// Number of entries to skip
    #[arg(long, default_value_t = 0)]
    pub offset: i64,
}

impl LogFilterArgs {
    /// Convert the filters into a query with default paging
    pub fn to_query(&self) -> AuditResult<LogQuery> {
        Ok(LogQuery {
            actor_id: self.actor,
            source: self.source.clone(),
            severity: self.level,
            since: self.since.as_deref().map(parse_time_arg).transpose()?,
            until: self.until.as_deref().map(parse_time_arg).transpose()?,
            ..LogQuery::default()
        })
    }
}

impl PageArgs {
    pub fn apply(&self, query: LogQuery) -> LogQuery {
        query.limit(self.limit).offset(self.offset)
    }
}

/// Parse a time argument; bare dates mean midnight UTC
fn parse_time_arg(value: &str) -> AuditResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            AuditError::Validation(format!(
                "Invalid time '{}'. Use RFC 3339 or YYYY-MM-DD",
                value
            ))
        })
}

/// Log subcommands
#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// List entries, newest first
    List {
        #[command(flatten)]
        filter: LogFilterArgs,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one entry with its payload
    Show {
        /// Entry id
        id: i64,
    },
    /// Count entries matching the filters
    Count {
        #[command(flatten)]
        filter: LogFilterArgs,
    },
}

/// Handle a log command
pub fn handle_log_command(
    conn: &Connection,
    settings: &Settings,
    cmd: LogCommands,
) -> AuditResult<()> {
    let table = settings.table_name.as_str();

    match cmd {
        LogCommands::List { filter, page } => {
            let entries = query_entries(conn, table, &page.apply(filter.to_query()?))?;
            print!("{}", format_log_list(&entries));
            if entries.is_empty() {
                println!();
            }
        }
        LogCommands::Show { id } => {
            let entry = get_entry(conn, table, id)?;
            print!("{}", format_log_details(&entry));
        }
        LogCommands::Count { filter } => {
            let count = count_entries(conn, table, &filter.to_query()?)?;
            println!("{}", count);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> LogFilterArgs {
        LogFilterArgs {
            actor: None,
            source: None,
            level: None,
            since: None,
            until: None,
        }
    }

    #[test]
    fn test_parse_time_arg() {
        let date = parse_time_arg("2026-10-19").unwrap();
        let rfc = parse_time_arg("2026-10-19T00:00:00Z").unwrap();
        assert_eq!(date, rfc);
        assert!(parse_time_arg("last week").is_err());
    }

    #[test]
    fn test_filter_to_query() {
        let mut args = filter();
        args.actor = Some(3);
        args.level = Some(Severity::Error);
        args.since = Some("2026-01-01".into());

        let query = args.to_query().unwrap();
        assert_eq!(query.actor_id, Some(3));
        assert_eq!(query.severity, Some(Severity::Error));
        assert!(query.since.is_some());
        assert!(query.until.is_none());
        assert_eq!(query.limit, DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn test_page_args_apply() {
        let page = PageArgs {
            limit: 5,
            offset: 10,
        };
        let query = page.apply(filter().to_query().unwrap());
        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 10);
    }

    #[test]
    fn test_invalid_time_rejected() {
        let mut args = filter();
        args.until = Some("soon".into());
        assert!(args.to_query().is_err());
    }
}
