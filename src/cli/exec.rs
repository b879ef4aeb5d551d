//! Exec CLI command
//!
//! Runs one statement through an audited session so that write statements
//! are mirrored into the log table.

use clap::Args;
use rusqlite::Connection;

use crate::actor::{resolve_actor, FixedActor, NoActor};
use crate::config::Settings;
use crate::error::AuditResult;
use crate::hooks::{AuditListener, HookRegistry};
use crate::models::FieldValue;
use crate::session::AuditSession;

/// Arguments of the exec command
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// SQL statement; use ?1, ?2, ... for parameters
    pub sql: String,

    /// Parameters bound in order; numbers, true/false and null are typed
    #[arg(allow_negative_numbers = true)]
    pub params: Vec<String>,

    /// Actor id the statement is attributed to
    #[arg(short, long, env = "AUDIT_TRAIL_ACTOR")]
    pub actor: Option<i64>,
}

/// Handle the exec command
pub fn handle_exec_command(
    conn: &mut Connection,
    settings: &Settings,
    args: ExecArgs,
) -> AuditResult<()> {
    let listener = AuditListener::from_settings(settings)?;
    let mirrored = settings.mirror_statements && listener.sink().should_mirror(&args.sql);

    let mut hooks = HookRegistry::new();
    hooks.register(listener);

    let actor = match args.actor {
        Some(id) => resolve_actor(&FixedActor(id)),
        None => resolve_actor(&NoActor),
    };

    let params: Vec<FieldValue> = args
        .params
        .iter()
        .map(|p| FieldValue::parse_literal(p))
        .collect();

    let session = AuditSession::begin(conn, hooks, actor)?;
    let affected = session.execute(&args.sql, &params)?;
    session.commit()?;

    println!("{} row(s) affected", affected);
    if mirrored {
        println!("Recorded in {} as actor {}", settings.table_name, actor);
    }

    Ok(())
}
