//! CLI command for log export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use rusqlite::Connection;

use super::log::LogFilterArgs;
use crate::config::Settings;
use crate::error::{AuditError, AuditResult};
use crate::export::{export_logs_csv, export_logs_json, export_logs_yaml, LogExport};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// CSV, one row per entry
    Csv,
    /// JSON with schema version and metadata
    Json,
    /// YAML, human-readable
    Yaml,
}

/// Arguments of the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path
    pub output: PathBuf,

    /// Export format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ExportFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    // Every matching entry is exported
    #[command(flatten)]
    pub filter: LogFilterArgs,
}

/// Handle the export command
pub fn handle_export_command(
    conn: &Connection,
    settings: &Settings,
    args: ExportArgs,
) -> AuditResult<()> {
    let export = LogExport::from_query(conn, &settings.table_name, &args.filter.to_query()?)?;

    let file = File::create(&args.output).map_err(|e| {
        AuditError::Export(format!(
            "Failed to create file {}: {}",
            args.output.display(),
            e
        ))
    })?;
    let mut writer = BufWriter::new(file);

    match args.format {
        ExportFormat::Csv => export_logs_csv(&export.entries, &mut writer)?,
        ExportFormat::Json => export_logs_json(&export, &mut writer, args.pretty)?,
        ExportFormat::Yaml => export_logs_yaml(&export, &mut writer)?,
    }
    writer
        .flush()
        .map_err(|e| AuditError::Export(e.to_string()))?;

    println!(
        "Exported {} entries to: {}",
        export.metadata.entry_count,
        args.output.display()
    );

    Ok(())
}
