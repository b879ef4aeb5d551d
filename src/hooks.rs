//! Lifecycle hooks
//!
//! An [`crate::session::AuditSession`] fires these after each write, on the
//! same transaction. Hooks are registered explicitly on a [`HookRegistry`]
//! at startup; nothing is attached implicitly.
//!
//! A hook error aborts the write that triggered it.

use std::fmt;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::debug;

use crate::actor::ActorId;
use crate::audit::RecordBuilder;
use crate::config::Settings;
use crate::error::AuditResult;
use crate::models::{Auditable, FieldValue};
use crate::storage::AuditSink;

/// Callbacks fired after writes
///
/// Every method defaults to doing nothing.
pub trait LifecycleHooks: Send + Sync {
    /// A new entity row was inserted
    fn after_insert(
        &self,
        _conn: &Connection,
        _entity: &dyn Auditable,
        _actor: ActorId,
    ) -> AuditResult<()> {
        Ok(())
    }

    /// An entity row was updated; `entity` still carries its change history
    fn after_update(
        &self,
        _conn: &Connection,
        _entity: &dyn Auditable,
        _actor: ActorId,
    ) -> AuditResult<()> {
        Ok(())
    }

    /// An entity row was deleted
    fn after_delete(
        &self,
        _conn: &Connection,
        _entity: &dyn Auditable,
        _actor: ActorId,
    ) -> AuditResult<()> {
        Ok(())
    }

    /// A raw statement was executed
    fn after_execute(
        &self,
        _conn: &Connection,
        _statement: &str,
        _params: &[FieldValue],
        _actor: ActorId,
    ) -> AuditResult<()> {
        Ok(())
    }
}

/// Writes an audit entry for every entity write, and optionally mirrors
/// raw statements
#[derive(Debug)]
pub struct AuditListener {
    builder: RecordBuilder,
    sink: AuditSink,
    mirror_statements: bool,
}

impl AuditListener {
    pub fn new(builder: RecordBuilder, sink: AuditSink) -> Self {
        Self {
            builder,
            sink,
            mirror_statements: true,
        }
    }

    /// Build a listener from user settings
    pub fn from_settings(settings: &Settings) -> AuditResult<Self> {
        Ok(Self::new(
            RecordBuilder::new(settings.entity_source.clone()),
            AuditSink::from_settings(settings)?,
        )
        .with_statement_mirroring(settings.mirror_statements))
    }

    pub fn with_statement_mirroring(mut self, enabled: bool) -> Self {
        self.mirror_statements = enabled;
        self
    }

    pub fn sink(&self) -> &AuditSink {
        &self.sink
    }
}

impl LifecycleHooks for AuditListener {
    fn after_insert(
        &self,
        conn: &Connection,
        entity: &dyn Auditable,
        actor: ActorId,
    ) -> AuditResult<()> {
        let entry = self.builder.for_create(entity, actor);
        self.sink.record(conn, &entry)?;
        Ok(())
    }

    fn after_update(
        &self,
        conn: &Connection,
        entity: &dyn Auditable,
        actor: ActorId,
    ) -> AuditResult<()> {
        let entry = self.builder.for_update(entity, actor);
        self.sink.record(conn, &entry)?;
        Ok(())
    }

    fn after_delete(
        &self,
        conn: &Connection,
        entity: &dyn Auditable,
        actor: ActorId,
    ) -> AuditResult<()> {
        let entry = self.builder.for_delete(entity, actor);
        self.sink.record(conn, &entry)?;
        Ok(())
    }

    fn after_execute(
        &self,
        conn: &Connection,
        statement: &str,
        params: &[FieldValue],
        actor: ActorId,
    ) -> AuditResult<()> {
        if self.mirror_statements {
            self.sink.mirror_statement(conn, statement, params, actor)?;
        }
        Ok(())
    }
}

/// Ordered set of registered hooks
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn LifecycleHooks>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook; hooks fire in registration order
    pub fn register<H: LifecycleHooks + 'static>(&mut self, hook: H) -> &mut Self {
        self.hooks.push(Arc::new(hook));
        debug!(count = self.hooks.len(), "Registered lifecycle hook");
        self
    }

    /// Register a hook that is shared with other registries
    pub fn register_shared(&mut self, hook: Arc<dyn LifecycleHooks>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn fire_insert(
        &self,
        conn: &Connection,
        entity: &dyn Auditable,
        actor: ActorId,
    ) -> AuditResult<()> {
        for hook in &self.hooks {
            hook.after_insert(conn, entity, actor)?;
        }
        Ok(())
    }

    pub fn fire_update(
        &self,
        conn: &Connection,
        entity: &dyn Auditable,
        actor: ActorId,
    ) -> AuditResult<()> {
        for hook in &self.hooks {
            hook.after_update(conn, entity, actor)?;
        }
        Ok(())
    }

    pub fn fire_delete(
        &self,
        conn: &Connection,
        entity: &dyn Auditable,
        actor: ActorId,
    ) -> AuditResult<()> {
        for hook in &self.hooks {
            hook.after_delete(conn, entity, actor)?;
        }
        Ok(())
    }

    pub fn fire_execute(
        &self,
        conn: &Connection,
        statement: &str,
        params: &[FieldValue],
        actor: ActorId,
    ) -> AuditResult<()> {
        for hook in &self.hooks {
            hook.after_execute(conn, statement, params, actor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::models::TrackedRecord;
    use crate::storage::{init_schema, query_entries, LogQuery};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl LifecycleHooks for Recorder {
        fn after_insert(
            &self,
            _conn: &Connection,
            entity: &dyn Auditable,
            actor: ActorId,
        ) -> AuditResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("insert {} by {}", entity.entity_name(), actor));
            Ok(())
        }
    }

    struct Failing;

    impl LifecycleHooks for Failing {
        fn after_delete(
            &self,
            _conn: &Connection,
            _entity: &dyn Auditable,
            _actor: ActorId,
        ) -> AuditResult<()> {
            Err(AuditError::Storage("boom".into()))
        }
    }

    fn user() -> TrackedRecord {
        let mut record = TrackedRecord::new("users", ["name", "age"]).unwrap();
        record.set("name", "Alice").unwrap();
        record.set("age", 30).unwrap();
        record
    }

    #[test]
    fn test_registry_fires_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        let recorder = Arc::new(Recorder::default());

        let mut registry = HookRegistry::new();
        registry.register_shared(recorder.clone());
        registry.register_shared(recorder.clone());
        assert_eq!(registry.len(), 2);

        registry
            .fire_insert(&conn, &user(), ActorId::new(4))
            .unwrap();
        // Default methods are no-ops
        registry
            .fire_update(&conn, &user(), ActorId::new(4))
            .unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(*calls, vec!["insert users by 4", "insert users by 4"]);
    }

    #[test]
    fn test_hook_error_propagates() {
        let conn = Connection::open_in_memory().unwrap();
        let mut registry = HookRegistry::new();
        registry.register(Failing);

        let err = registry
            .fire_delete(&conn, &user(), ActorId::UNKNOWN)
            .unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_listener_records_entity_writes() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, "logs").unwrap();
        let listener = AuditListener::from_settings(&Settings::default()).unwrap();

        listener
            .after_insert(&conn, &user(), ActorId::new(1))
            .unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Create object");
        assert_eq!(entries[0].source, "audit_trail.entity");
    }

    #[test]
    fn test_listener_mirroring_toggle() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, "logs").unwrap();

        let enabled = AuditListener::from_settings(&Settings::default()).unwrap();
        let disabled = AuditListener::from_settings(&Settings::default())
            .unwrap()
            .with_statement_mirroring(false);

        let statement = "DELETE FROM users WHERE id = ?1";
        let params = [FieldValue::Int(1)];
        disabled
            .after_execute(&conn, statement, &params, ActorId::UNKNOWN)
            .unwrap();
        enabled
            .after_execute(&conn, statement, &params, ActorId::UNKNOWN)
            .unwrap();

        let entries = query_entries(&conn, "logs", &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, statement);
    }
}
