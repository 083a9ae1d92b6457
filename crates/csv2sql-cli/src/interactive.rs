//! Interactive menu mode.
//!
//! A plain stdin loop for users who prefer prompts over flags. Each action
//! opens its own connection so a failed backend never wedges the menu.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use csv2sql_core::loader::CancelFlag;
use csv2sql_core::operations;
use csv2sql_core::plan::IfExists;
use csv2sql_core_common::adapter::DatabaseAdapter;
use csv2sql_core_common::backends::find_backend;
use csv2sql_core_common::config::AppConfig;

use crate::display;
use crate::progress::ImportProgress;

const MENU: &str = "\
\ncsv2sql interactive mode
  1) Import a CSV file
  2) Analyze a CSV file (no database writes)
  3) List databases
  4) List tables
  5) Create a database
  6) Drop a database
  7) Quit
";

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_with_default(label: &str, default: &str) -> io::Result<String> {
    let answer = prompt(&format!("{label} [{default}]"))?;
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer
    })
}

/// Connects and prints the failure instead of propagating it, so the menu
/// loop survives an unreachable backend.
async fn connect_or_report(config: &AppConfig) -> Option<Box<dyn DatabaseAdapter>> {
    match operations::connect(&config.database).await {
        Ok(adapter) => Some(adapter),
        Err(e) => {
            eprintln!("{}", e.user_message());
            None
        },
    }
}

async fn import_action(config: &AppConfig) -> Result<()> {
    let path = PathBuf::from(prompt("CSV file path")?);
    let table = prompt_with_default("Table name", &operations::table_name_from_path(&path))?;
    let if_exists: IfExists =
        match prompt_with_default("If table exists (fail/replace/append)", "append")?.parse() {
            Ok(policy) => policy,
            Err(e) => {
                eprintln!("{e}");
                return Ok(());
            },
        };

    let analysis = match operations::analyze(&path, &config.csv) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Ok(());
        },
    };
    display::print_analysis(&analysis);

    let Some(adapter) = connect_or_report(config).await else {
        return Ok(());
    };
    let mut progress = ImportProgress::new(&table);
    let result = operations::import(
        adapter.as_ref(),
        &path,
        &analysis,
        &table,
        if_exists,
        &config.csv,
        &CancelFlag::new(),
        &mut progress,
    )
    .await;
    progress.finish();
    adapter.close().await;

    match result {
        Ok(report) => display::print_report(&table, &report),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}

fn analyze_action(config: &AppConfig) -> Result<()> {
    let path = PathBuf::from(prompt("CSV file path")?);
    match operations::analyze(&path, &config.csv) {
        Ok(analysis) => display::print_analysis(&analysis),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}

async fn list_databases_action(config: &AppConfig) -> Result<()> {
    let Some(adapter) = connect_or_report(config).await else {
        return Ok(());
    };
    let result = operations::list_databases(adapter.as_ref()).await;
    adapter.close().await;
    match result {
        Ok(names) => display::print_names("Databases", &names),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}

async fn list_tables_action(config: &AppConfig) -> Result<()> {
    let Some(adapter) = connect_or_report(config).await else {
        return Ok(());
    };
    let result = operations::list_tables(adapter.as_ref()).await;
    adapter.close().await;
    match result {
        Ok(names) => display::print_names("Tables", &names),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}

fn manage_supported(config: &AppConfig) -> bool {
    match find_backend(&config.database.kind) {
        Some(backend) => backend.capabilities.manage_databases.is_supported(),
        None => true, // let the connect path report the unknown backend
    }
}

async fn create_database_action(config: &AppConfig) -> Result<()> {
    if !manage_supported(config) {
        println!("This backend does not support creating or dropping databases.");
        return Ok(());
    }
    let name = prompt("Database name")?;
    let Some(adapter) = connect_or_report(config).await else {
        return Ok(());
    };
    let result = operations::create_database(adapter.as_ref(), &name).await;
    adapter.close().await;
    match result {
        Ok(()) => println!("Database '{name}' created."),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}

async fn drop_database_action(config: &AppConfig) -> Result<()> {
    if !manage_supported(config) {
        println!("This backend does not support creating or dropping databases.");
        return Ok(());
    }
    let name = prompt("Database name")?;
    let confirm = prompt(&format!("Type '{name}' again to confirm the drop"))?;
    if confirm != name {
        println!("Drop aborted.");
        return Ok(());
    }
    let Some(adapter) = connect_or_report(config).await else {
        return Ok(());
    };
    let result = operations::drop_database(adapter.as_ref(), &name).await;
    adapter.close().await;
    match result {
        Ok(()) => println!("Database '{name}' dropped."),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}

/// Runs the menu loop until the user quits or stdin closes.
///
/// # Errors
///
/// Only I/O failures on the terminal abort the loop; operation errors are
/// printed and the menu is shown again.
pub async fn run(config: &AppConfig) -> Result<()> {
    loop {
        println!("{MENU}");
        let choice = prompt("Select an option")?;
        match choice.as_str() {
            "1" => import_action(config).await?,
            "2" => analyze_action(config)?,
            "3" => list_databases_action(config).await?,
            "4" => list_tables_action(config).await?,
            "5" => create_database_action(config).await?,
            "6" => drop_database_action(config).await?,
            "7" | "q" | "quit" | "exit" | "" => {
                println!("Bye.");
                return Ok(());
            },
            other => println!("'{other}' is not a menu option."),
        }
    }
}
