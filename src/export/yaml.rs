//! YAML Export functionality

use std::io::Write;

use crate::error::{AuditError, AuditResult};
use crate::export::json::LogExport;

/// Write an export as YAML, preceded by a comment header
pub fn export_logs_yaml<W: Write>(export: &LogExport, mut writer: W) -> AuditResult<()> {
    let header = format!(
        "# audit-trail log export\n# Generated: {}\n# Table: {}\n# Entries: {}\n\n",
        export.exported_at, export.table, export.metadata.entry_count
    );
    writer
        .write_all(header.as_bytes())
        .map_err(|e| AuditError::Export(e.to_string()))?;

    serde_yaml::to_writer(writer, export).map_err(|e| AuditError::Export(e.to_string()))?;

    Ok(())
}

/// Read back a YAML export
pub fn import_from_yaml(yaml_str: &str) -> AuditResult<LogExport> {
    let export: LogExport =
        serde_yaml::from_str(yaml_str).map_err(|e| AuditError::Export(e.to_string()))?;

    export.validate().map_err(AuditError::Export)?;

    Ok(export)
}
