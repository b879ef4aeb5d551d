//! Configuration module for audit-trail
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::AuditPaths;
pub use settings::Settings;
