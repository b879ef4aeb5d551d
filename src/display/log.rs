//! Log entry display formatting

use crate::audit::diff::update_detail_lines;
use crate::audit::entry::truncate_chars;
use crate::audit::AuditEntry;

const MESSAGE_WIDTH: usize = 50;

fn timestamp(entry: &AuditEntry) -> String {
    entry
        .created_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn short_message(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("");
    if first_line.chars().count() > MESSAGE_WIDTH {
        format!("{}...", truncate_chars(first_line, MESSAGE_WIDTH - 3))
    } else {
        first_line.to_string()
    }
}

/// Format a list of log entries as a table
pub fn format_log_list(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return "No log entries found.".to_string();
    }

    let ids: Vec<String> = entries
        .iter()
        .map(|e| e.id.map(|id| id.to_string()).unwrap_or_default())
        .collect();

    let id_width = ids.iter().map(|s| s.len()).max().unwrap_or(2).max(2);
    let source_width = entries
        .iter()
        .map(|e| e.source.len())
        .max()
        .unwrap_or(6)
        .max(6);

    let mut output = String::new();
    output.push_str(&format!(
        "{:>id_width$}  {:<19}  {:>6}  {:<source_width$}  {:<5}  {}\n",
        "ID",
        "Time",
        "Actor",
        "Source",
        "Level",
        "Message",
        id_width = id_width,
        source_width = source_width,
    ));
    output.push_str(&format!(
        "{:->id_width$}  {:-<19}  {:->6}  {:-<source_width$}  {:-<5}  {:-<7}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        id_width = id_width,
        source_width = source_width,
    ));

    for (entry, id) in entries.iter().zip(&ids) {
        output.push_str(&format!(
            "{:>id_width$}  {:<19}  {:>6}  {:<source_width$}  {:<5}  {}\n",
            id,
            timestamp(entry),
            entry.actor().to_string(),
            entry.source,
            entry.severity.as_str(),
            short_message(&entry.message),
            id_width = id_width,
            source_width = source_width,
        ));
    }

    output
}

/// Format a single entry with its payload
///
/// Update entries show a field-by-field diff; other payloads are printed as
/// pretty JSON, or verbatim when they are not JSON.
pub fn format_log_details(entry: &AuditEntry) -> String {
    let mut output = String::new();

    match entry.id {
        Some(id) => output.push_str(&format!("Log entry #{}\n", id)),
        None => output.push_str("Log entry (unsaved)\n"),
    }
    output.push_str(&format!("  Time:    {}\n", timestamp(entry)));
    output.push_str(&format!("  Actor:   {}\n", entry.actor()));
    output.push_str(&format!("  Source:  {}\n", entry.source));
    output.push_str(&format!("  Level:   {}\n", entry.severity));
    output.push_str(&format!("  Message: {}\n", entry.message));

    if let Some(trace) = &entry.trace {
        output.push('\n');
        output.push_str("  Trace:\n");
        for line in trace.lines() {
            output.push_str(&format!("    {}\n", line));
        }
    }

    output.push('\n');
    match entry.details_json() {
        Ok(details) => {
            if let Some(changes) = update_detail_lines(&details) {
                output.push_str("  Changes:\n");
                for change in changes {
                    output.push_str(&format!("    {}\n", change));
                }
            } else {
                output.push_str("  Details:\n");
                let pretty =
                    serde_json::to_string_pretty(&details).unwrap_or_else(|_| entry.details.clone());
                for line in pretty.lines() {
                    output.push_str(&format!("    {}\n", line));
                }
            }
        }
        Err(_) => {
            output.push_str(&format!("  Details: {}\n", entry.details));
        }
    }

    output
}
