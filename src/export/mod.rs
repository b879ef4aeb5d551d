//! Export module for audit-trail
//!
//! Writes query results out of the log table:
//! - CSV: one row per entry (spreadsheet-compatible)
//! - JSON: entries plus schema version and export metadata
//! - YAML: the JSON structure in human-readable form

pub mod csv;
pub mod json;
pub mod yaml;

pub use self::csv::export_logs_csv;
pub use json::{export_logs_json, import_from_json, ExportMetadata, LogExport, EXPORT_SCHEMA_VERSION};
pub use yaml::{export_logs_yaml, import_from_yaml};
