use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use audit_trail::cli::{
    handle_exec_command, handle_export_command, handle_log_command, ExecArgs, ExportArgs,
    LogCommands,
};
use audit_trail::config::{paths::AuditPaths, settings::Settings};
use audit_trail::logging::init_logging;
use audit_trail::storage::open_database;

#[derive(Parser)]
#[command(
    name = "audit-trail",
    author = "Kaylee Beyene",
    version,
    about = "Change tracking and audit logging for SQLite databases",
    long_about = "audit-trail records who changed what in a SQLite database. \
                  Write statements run through it are mirrored into a log table \
                  on the same transaction, and the log can be listed, inspected \
                  and exported from the command line."
)]
struct Cli {
    /// Base directory for settings and the database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the settings file and the log table
    Init,

    /// Show current configuration and paths
    Config,

    /// Inspect the audit log
    #[command(subcommand)]
    Log(LogCommands),

    /// Run a statement through an audited session
    Exec(ExecArgs),

    /// Export log entries to a file
    Export(ExportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => AuditPaths::with_base_dir(dir),
        None => AuditPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;
    init_logging(settings.log_level)?;

    let database = paths.database_file(&settings.database_file);

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing audit-trail at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            open_database(&database, &settings.table_name)?;
            println!("Initialized log table '{}' in {}", settings.table_name, database.display());
            println!();
            println!("Run 'audit-trail exec <SQL>' to run an audited statement.");
        }
        Some(Commands::Config) => {
            println!("audit-trail Configuration");
            println!("=========================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!("Database:       {}", database.display());
            println!();
            println!("Settings:");
            println!("  Log table:         {}", settings.table_name);
            println!("  Entity source:     {}", settings.entity_source);
            println!("  Statement source:  {}", settings.statement_source);
            println!("  Mirror statements: {}", settings.mirror_statements);
            println!("  Mirror keywords:   {}", settings.mirror_keywords.join(", "));
            println!("  Log level:         {}", settings.log_level);
            if !paths.is_initialized() {
                println!();
                println!("Not initialized yet. Run 'audit-trail init'.");
            }
        }
        Some(Commands::Log(cmd)) => {
            let conn = open_database(&database, &settings.table_name)?;
            handle_log_command(&conn, &settings, cmd)?;
        }
        Some(Commands::Exec(args)) => {
            let mut conn = open_database(&database, &settings.table_name)?;
            handle_exec_command(&mut conn, &settings, args)?;
        }
        Some(Commands::Export(args)) => {
            let conn = open_database(&database, &settings.table_name)?;
            handle_export_command(&conn, &settings, args)?;
        }
        None => {
            println!("audit-trail - Change tracking and audit logging");
            println!();
            println!("Run 'audit-trail --help' for usage information.");
        }
    }

    Ok(())
}
