//! Command-line interface for `csv2sql`, a CSV-to-SQL import tool.
//!
//! This binary provides a user-friendly CLI over the [`csv2sql_core`]
//! library: it analyzes CSV files, infers column types, and bulk-loads the
//! rows into MySQL, PostgreSQL, or SQLite.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing, [`figment`] for
//! layered configuration, and [`tracing`] for structured logging. It acts
//! as a thin façade that parses arguments, merges configuration, and
//! delegates to the operations in the core crate.
//!
//! # Available Commands
//!
//! - `import-csv` - Analyze a CSV file and load it into a table
//! - `list-databases` / `list-tables` - Inspect the connected server
//! - `create-database` / `drop-database` - Manage databases
//! - `backends` - List supported database backends and their capabilities
//! - `interactive` - Menu-driven mode

mod config;
mod display;
mod interactive;
mod progress;

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use csv2sql_core::error::CsvSqlError;
use csv2sql_core::loader::CancelFlag;
use csv2sql_core::operations;
use csv2sql_core::plan::IfExists;
use csv2sql_core_common::backends::{find_backend, get_available_backends};
use csv2sql_core_common::config::AppConfig;

use crate::config::CliOverrides;
use crate::progress::ImportProgress;

/// Exit code for runs that finished but lost rows to rejection or chunk
/// rollback.
const EXIT_DEGRADED: u8 = 2;

fn parse_if_exists(s: &str) -> Result<IfExists, String> {
    s.parse()
}

#[derive(Parser)]
#[command(
    name = "csv2sql",
    version,
    about = "Import CSV files into SQL databases with automatic type inference",
    long_about = "csv2sql analyzes a CSV file, infers the narrowest SQL type for each column,\n\
                  creates the destination table, and bulk-loads the rows in transactional chunks.\n\
                  MySQL, PostgreSQL and SQLite are supported."
)]
/// Command-line arguments and options for the `csv2sql` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to a YAML or JSON config file.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database backend to connect to (mysql, postgres, sqlite).
    #[arg(long, global = true, value_name = "BACKEND")]
    db_type: Option<String>,

    /// Database server host.
    #[arg(long, global = true, value_name = "HOST")]
    host: Option<String>,

    /// Database server port.
    #[arg(long, global = true, value_name = "PORT")]
    port: Option<u16>,

    /// Database user name.
    #[arg(long, global = true, value_name = "USER")]
    username: Option<String>,

    /// Database password.
    #[arg(long, global = true, value_name = "PASSWORD")]
    password: Option<String>,

    /// Database name (for SQLite, the database file path).
    #[arg(long, global = true, value_name = "NAME")]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `csv2sql` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Analyzes a CSV file and loads it into a database table.
    ///
    /// The column types are inferred from the data. The table is created
    /// (or reused, per --if-exists) before any rows are inserted.
    ImportCsv {
        /// Path to the CSV file to import.
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Destination table name. Defaults to the file stem, cleaned.
        #[arg(short, long, value_name = "TABLE")]
        table: Option<String>,

        /// What to do when the table already exists.
        #[arg(long, value_name = "POLICY", value_parser = parse_if_exists, default_value = "append")]
        if_exists: IfExists,

        /// Rows per transactional insert chunk.
        #[arg(long, value_name = "ROWS")]
        chunk_size: Option<usize>,

        /// Only print the inferred schema; do not touch the database.
        #[arg(long)]
        analyze_only: bool,

        /// Skip the confirmation prompt when replacing an existing table.
        #[arg(short, long)]
        yes: bool,
    },

    /// Lists databases visible to the connection.
    ListDatabases,

    /// Lists tables in the configured database.
    ListTables,

    /// Creates a database on the connected server.
    CreateDatabase {
        /// Name of the database to create.
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Drops a database on the connected server.
    DropDatabase {
        /// Name of the database to drop.
        #[arg(value_name = "NAME")]
        name: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Lists all supported database backends and their capabilities.
    Backends,

    /// Starts the menu-driven interactive mode.
    Interactive,
}

/// Entry point for the `csv2sql` command-line interface.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<CsvSqlError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("Error: {e}"),
            }
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut app_config = config::load(cli.config.as_deref())?;
    config::apply_overrides(
        &mut app_config,
        &CliOverrides {
            db_type: cli.db_type,
            host: cli.host,
            port: cli.port,
            username: cli.username,
            password: cli.password,
            database: cli.database,
            chunk_size: None,
        },
    );
    init_logging(&app_config, cli.verbose, cli.debug)?;

    match cli.command {
        Commands::ImportCsv {
            input,
            table,
            if_exists,
            chunk_size,
            analyze_only,
            yes,
        } => {
            if let Some(rows) = chunk_size {
                app_config.csv.chunk_size = rows.max(1);
            }
            handle_import(&app_config, &input, table, if_exists, analyze_only, yes).await
        },
        Commands::ListDatabases => {
            let adapter = operations::connect(&app_config.database).await?;
            let result = operations::list_databases(adapter.as_ref()).await;
            adapter.close().await;
            display::print_names("Databases", &result?);
            Ok(ExitCode::SUCCESS)
        },
        Commands::ListTables => {
            let adapter = operations::connect(&app_config.database).await?;
            let result = operations::list_tables(adapter.as_ref()).await;
            adapter.close().await;
            display::print_names("Tables", &result?);
            Ok(ExitCode::SUCCESS)
        },
        Commands::CreateDatabase { name } => {
            ensure_manage_supported(&app_config.database.kind)?;
            let adapter = operations::connect(&app_config.database).await?;
            let result = operations::create_database(adapter.as_ref(), &name).await;
            adapter.close().await;
            result?;
            println!("Database '{name}' created.");
            Ok(ExitCode::SUCCESS)
        },
        Commands::DropDatabase { name, force } => {
            ensure_manage_supported(&app_config.database.kind)?;
            if !force && !confirm_drop(&name)? {
                println!("Drop aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            let adapter = operations::connect(&app_config.database).await?;
            let result = operations::drop_database(adapter.as_ref(), &name).await;
            adapter.close().await;
            result?;
            println!("Database '{name}' dropped.");
            Ok(ExitCode::SUCCESS)
        },
        Commands::Backends => {
            display::print_backends(&get_available_backends());
            Ok(ExitCode::SUCCESS)
        },
        Commands::Interactive => {
            interactive::run(&app_config).await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Configures the `tracing` subscriber from flags and the logging section.
///
/// Flags win over the configured level. With a log file configured, output
/// goes to the file without ANSI escapes; otherwise to stderr.
fn init_logging(config: &AppConfig, verbose: bool, debug: bool) -> Result<()> {
    let level = if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        config
            .logging
            .level
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Level::WARN)
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        },
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(true)
                .with_writer(io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        },
    }
    Ok(())
}

async fn handle_import(
    config: &AppConfig,
    input: &std::path::Path,
    table: Option<String>,
    if_exists: IfExists,
    analyze_only: bool,
    yes: bool,
) -> Result<ExitCode> {
    let table = table.unwrap_or_else(|| operations::table_name_from_path(input));

    let analysis = operations::analyze(input, &config.csv)?;
    display::print_analysis(&analysis);
    if analyze_only {
        return Ok(ExitCode::SUCCESS);
    }

    let adapter = operations::connect(&config.database).await?;

    if if_exists == IfExists::Replace && !yes {
        let exists = adapter.table_exists(&table).await;
        if matches!(exists, Ok(true)) && !confirm_replace(&table)? {
            adapter.close().await;
            println!("Import aborted.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    // Ctrl-C finishes the current chunk, then stops cleanly.
    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("cancellation requested");
            signal_flag.cancel();
        }
    });

    let mut bar = ImportProgress::new(&table);
    let result = operations::import(
        adapter.as_ref(),
        input,
        &analysis,
        &table,
        if_exists,
        &config.csv,
        &cancel,
        &mut bar,
    )
    .await;
    bar.finish();
    adapter.close().await;

    let report = result?;
    display::print_report(&table, &report);
    if report.is_degraded() {
        Ok(ExitCode::from(EXIT_DEGRADED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Rejects database management commands on backends whose registry entry
/// marks them unsupported. Unknown backend names fall through to the
/// connection path, which reports them with the full backend list.
fn ensure_manage_supported(kind: &str) -> Result<()> {
    if let Some(backend) = find_backend(kind) {
        if !backend.capabilities.manage_databases.is_supported() {
            anyhow::bail!(
                "backend '{}' does not support creating or dropping databases",
                backend.short_name
            );
        }
    }
    Ok(())
}

fn confirm_replace(table: &str) -> Result<bool> {
    confirm(&format!(
        "Table '{table}' exists and will be dropped. Continue? [y/N]: "
    ))
}

fn confirm_drop(name: &str) -> Result<bool> {
    confirm(&format!(
        "Database '{name}' will be dropped. Continue? [y/N]: "
    ))
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
