//! Audit entry data structures
//!
//! Defines the structure of audit log entries including operation types,
//! severities, and the entry format itself.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::error::AuditError;

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Entity was created
    Create,
    /// Entity was updated
    Update,
    /// Entity was deleted
    Delete,
}

impl Operation {
    /// Message stored with structured entries
    pub fn message(&self) -> &'static str {
        match self {
            Operation::Create => "Create object",
            Operation::Update => "Update object",
            Operation::Delete => "Delete object",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
        }
    }
}

/// Severity stored in the `level` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Info,
    Debug,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "DEBUG" => Ok(Severity::Debug),
            "ERROR" => Ok(Severity::Error),
            _ => Err(AuditError::Validation(format!("Invalid severity: {}", s))),
        }
    }
}

/// A single audit log entry
///
/// Entries are built in memory with `id` and `created_at` unset; the sink
/// assigns both when the row is inserted. Stored entries are never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Row identifier, set once stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Acting user; `0` when nobody was in context
    pub actor_id: Option<i64>,

    /// Label of the component that emitted the entry
    pub source: String,

    pub severity: Severity,

    /// Optional traceback or context text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,

    pub message: String,

    /// Serialized payload; its shape depends on the entry kind
    pub details: String,

    /// Insert time, set by the sink
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuditEntry {
    /// Create an INFO entry that has not been stored yet
    pub fn new(
        actor: ActorId,
        source: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            actor_id: Some(actor.value()),
            source: source.into(),
            severity: Severity::Info,
            trace: None,
            message: message.into(),
            details: details.into(),
            created_at: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Actor identity with missing values normalized to the sentinel
    pub fn actor(&self) -> ActorId {
        ActorId::from_optional(self.actor_id)
    }

    /// Parse the details payload as JSON
    pub fn details_json(&self) -> Result<serde_json::Value, AuditError> {
        Ok(serde_json::from_str(&self.details)?)
    }

    /// Format the entry for human-readable output
    ///
    /// `<Log: 2026-10-19 12:00:00 - Create object>` once stored, the bare
    /// message before that. Messages are cut at 50 characters.
    pub fn format_human_readable(&self) -> String {
        match &self.created_at {
            Some(ts) => format!(
                "<Log: {} - {}>",
                ts.format("%Y-%m-%d %H:%M:%S"),
                truncate_chars(&self.message, 50)
            ),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_human_readable())
    }
}

/// First `max` characters of `s`
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
