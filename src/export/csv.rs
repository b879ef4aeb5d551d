//! CSV Export functionality

use std::io::Write;

use crate::audit::AuditEntry;
use crate::error::{AuditError, AuditResult};
use crate::storage::format_timestamp;

const HEADER: [&str; 8] = [
    "ID", "Created At", "Actor", "Source", "Level", "Message", "Details", "Trace",
];

/// Write entries as CSV with a header row
pub fn export_logs_csv<W: Write>(entries: &[AuditEntry], writer: W) -> AuditResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(HEADER)
        .map_err(|e| AuditError::Export(e.to_string()))?;

    for entry in entries {
        let id = entry.id.map(|id| id.to_string()).unwrap_or_default();
        let created_at = entry
            .created_at
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_default();
        let actor = entry.actor().to_string();

        csv_writer
            .write_record([
                id.as_str(),
                created_at.as_str(),
                actor.as_str(),
                entry.source.as_str(),
                entry.severity.as_str(),
                entry.message.as_str(),
                entry.details.as_str(),
                entry.trace.as_deref().unwrap_or(""),
            ])
            .map_err(|e| AuditError::Export(e.to_string()))?;
    }

    csv_writer
        .flush()
        .map_err(|e| AuditError::Export(e.to_string()))?;

    Ok(())
}
