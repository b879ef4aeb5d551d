//! User settings for audit-trail
//!
//! Stored as `config.json` in the base directory. Every field has a default
//! so older or partial files keep loading.

use serde::{Deserialize, Serialize};

use super::paths::AuditPaths;
use crate::audit::DEFAULT_ENTITY_SOURCE;
use crate::error::AuditError;
use crate::logging::LogLevel;
use crate::storage::{
    validate_identifier, DEFAULT_MIRROR_KEYWORDS, DEFAULT_STATEMENT_SOURCE, DEFAULT_TABLE,
};

/// User settings for audit-trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Database file name, relative to the base directory
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Name of the log table
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Source label for entity entries
    #[serde(default = "default_entity_source")]
    pub entity_source: String,

    /// Source label for mirrored statements
    #[serde(default = "default_statement_source")]
    pub statement_source: String,

    /// Whether raw write statements are mirrored into the log
    #[serde(default = "default_true")]
    pub mirror_statements: bool,

    /// Keywords that mark a statement as a write
    #[serde(default = "default_mirror_keywords")]
    pub mirror_keywords: Vec<String>,

    /// Minimum level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_schema_version() -> u32 {
    1
}

fn default_database_file() -> String {
    "audit.db".to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_entity_source() -> String {
    DEFAULT_ENTITY_SOURCE.to_string()
}

fn default_statement_source() -> String {
    DEFAULT_STATEMENT_SOURCE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_mirror_keywords() -> Vec<String> {
    DEFAULT_MIRROR_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            database_file: default_database_file(),
            table_name: default_table_name(),
            entity_source: default_entity_source(),
            statement_source: default_statement_source(),
            mirror_statements: default_true(),
            mirror_keywords: default_mirror_keywords(),
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Check values that end up interpolated into SQL
    pub fn validate(&self) -> Result<(), AuditError> {
        validate_identifier(&self.table_name)
            .map_err(|e| AuditError::Config(format!("Invalid table_name: {}", e)))?;

        if self.database_file.trim().is_empty() {
            return Err(AuditError::Config("database_file must not be empty".into()));
        }
        if self.mirror_keywords.iter().any(|k| k.is_empty()) {
            return Err(AuditError::Config(
                "mirror_keywords must not contain empty entries".into(),
            ));
        }

        Ok(())
    }

    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &AuditPaths) -> Result<Self, AuditError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| AuditError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                AuditError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AuditPaths) -> Result<(), AuditError> {
        self.validate()?;
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AuditError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| AuditError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
