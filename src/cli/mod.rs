//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the audit core.

pub mod exec;
pub mod export;
pub mod log;

pub use exec::{handle_exec_command, ExecArgs};
pub use export::{handle_export_command, ExportArgs, ExportFormat};
pub use log::{handle_log_command, LogCommands, LogFilterArgs, PageArgs};
