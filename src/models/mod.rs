//! Data models for the audit layer
//!
//! This module contains the values, entity contract and tracked record type
//! that the change detector and the audited session work with.

pub mod entity;
pub mod metadata;
pub mod record;
pub mod value;

pub use entity::{Auditable, FieldHistory, Snapshot};
pub use metadata::{AuditMetadata, AUDIT_COLUMNS};
pub use record::{TrackedRecord, ID_COLUMN};
pub use value::{EntityRef, FieldValue};
