//! Change tracking and audit record construction
//!
//! Turns entity writes into append-only audit entries.
//!
//! # Architecture
//!
//! - `changes`: compares an entity's pending and persisted values and yields
//!   `FieldChange`s, substituting identifiers for entity references.
//! - `builder`: packages an operation, an actor and a snapshot or change list
//!   into an `AuditEntry`.
//! - `encoding`: JSON encoding of field values with an opaque tagged
//!   fallback, so building an entry never fails.
//! - `entry`: the `AuditEntry` record and its enums.
//! - `diff`: human-readable summaries of update entries.
//!
//! Persisting entries is the job of [`crate::storage::AuditSink`].
//!
//! # Example
//!
//! ```rust,ignore
//! use audit_trail::actor::ActorId;
//! use audit_trail::audit::RecordBuilder;
//!
//! let builder = RecordBuilder::default();
//! record.set("age", 31)?;
//! let entry = builder.for_update(&record, ActorId::new(7));
//! sink.record(&tx, &entry)?;
//! ```

pub mod builder;
pub mod changes;
pub mod diff;
pub mod encoding;
pub mod entry;

pub use builder::{build_entry, AuditPayload, RecordBuilder, DEFAULT_ENTITY_SOURCE};
pub use changes::{detect_all_changes, detect_changes, FieldChange};
pub use diff::{describe_changes, describe_update_details, update_detail_lines};
pub use encoding::{decode_details, encode_snapshot};
pub use entry::{AuditEntry, Operation, Severity};
