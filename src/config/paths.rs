//! Path management for audit-trail
//!
//! ## Path Resolution Order
//!
//! 1. `AUDIT_TRAIL_DATA_DIR` environment variable (if set)
//! 2. The platform configuration directory for `audit-trail`
//!    (`~/.config/audit-trail` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::AuditError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "AUDIT_TRAIL_DATA_DIR";

/// Manages all paths used by audit-trail
#[derive(Debug, Clone)]
pub struct AuditPaths {
    /// Base directory for settings and the database
    base_dir: PathBuf,
}

impl AuditPaths {
    /// Resolve the base directory from the environment or the platform
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, AuditError> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) => PathBuf::from(custom),
            None => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create AuditPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the database named in the settings
    pub fn database_file(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), AuditError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| AuditError::Io(format!("Failed to create base directory: {}", e)))?;
        Ok(())
    }

    /// Check if audit-trail has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, AuditError> {
    ProjectDirs::from("", "", "audit-trail")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| AuditError::Config("Could not determine home directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AuditPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.database_file("audit.db"),
            temp_dir.path().join("audit.db")
        );
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(DATA_DIR_ENV, temp_dir.path());
        let paths = AuditPaths::new().unwrap();
        env::remove_var(DATA_DIR_ENV);

        assert_eq!(paths.base_dir(), temp_dir.path());
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AuditPaths::with_base_dir(temp_dir.path().join("nested"));

        assert!(!paths.is_initialized());
        paths.ensure_directories().unwrap();
        assert!(paths.base_dir().exists());
    }
}
