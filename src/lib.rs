//! audit-trail - Change tracking and audit logging for SQL-backed data layers
//!
//! Records who changed what in a SQLite database. Entity writes produce
//! structured entries (a full snapshot on create/delete, an old/new pair per
//! changed field on update) and raw write statements can be mirrored
//! verbatim. Audit rows are written on the same transaction as the write they
//! describe.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `actor`: Identity of the user a write is attributed to
//! - `audit`: Change detection, entry building and value encoding
//! - `storage`: Log table schema, the audit sink and log queries
//! - `hooks`: Lifecycle hooks and their explicit registry
//! - `session`: Transactions that fire the hooks after each write
//! - `models`: Field values, the `Auditable` contract and tracked records
//! - `config`: Configuration and path management
//! - `display` / `export`: Terminal output and file export of log entries
//! - `cli`: Command handlers for the `audit-trail` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use audit_trail::actor::ActorId;
//! use audit_trail::config::Settings;
//! use audit_trail::hooks::{AuditListener, HookRegistry};
//! use audit_trail::models::TrackedRecord;
//! use audit_trail::session::AuditSession;
//!
//! let mut hooks = HookRegistry::new();
//! hooks.register(AuditListener::from_settings(&Settings::default())?);
//!
//! let session = AuditSession::begin(&mut conn, hooks, ActorId::new(7))?;
//! let mut user = TrackedRecord::new("users", ["name", "age"])?;
//! user.set("name", "Alice")?;
//! session.insert(&mut user)?;
//! session.commit()?;
//! ```

pub mod actor;
pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod hooks;
pub mod logging;
pub mod models;
pub mod session;
pub mod storage;

pub use error::{AuditError, AuditResult};
