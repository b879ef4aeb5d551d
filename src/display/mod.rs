//! Display formatting for terminal output
//!
//! Formats audit log entries as aligned tables and detail views.

pub mod log;

pub use log::{format_log_details, format_log_list};
