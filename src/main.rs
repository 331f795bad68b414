// Migration tool CLI binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use mediamove::config::RunConfig;
use mediamove::derive::StdinCollisionPrompt;
use mediamove::dispatch::StdinPrompt;
use mediamove::{orchestrator, scanner};

#[derive(Parser)]
#[command(name = "mediamove")]
#[command(about = "Rewrites a media-server catalog and its on-disk artifacts onto a new path layout", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all three rewrite passes plus date reconciliation against a run config
    Migrate {
        /// Path to the JSON run configuration
        config: PathBuf,
    },

    /// Scan an arbitrary database for occurrences of ids known to a catalog
    Scan {
        /// Catalog database to harvest known ids from
        library_db: PathBuf,
        /// Database to scan for occurrences of those ids
        scan_db: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Migrate { config } => cmd_migrate(config),
        Commands::Scan { library_db, scan_db } => cmd_scan(library_db, scan_db),
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn cmd_migrate(config_path: PathBuf) -> Result<()> {
    let cfg = RunConfig::load(&config_path)?;
    let mut prompt = StdinPrompt;
    let mut collision_prompt = StdinCollisionPrompt;
    let summary = orchestrator::run(&cfg, &mut prompt, &mut collision_prompt)?;

    println!("Migration complete.");
    println!("  id collisions:        {}", summary.collisions);
    println!("  dates fixed:          {}", summary.dates_fixed);
    println!("  files missing on disk: {}", summary.dates_missing_files);

    if summary.collisions > 0 {
        println!();
        println!("Warning: id collisions were detected; some catalog items may now be linked together unexpectedly.");
    }

    Ok(())
}

fn cmd_scan(library_db: PathBuf, scan_db: PathBuf) -> Result<()> {
    let library_conn = Connection::open(&library_db)?;
    let id_sets = scanner::IdSets::load(&library_conn)?;

    let scan_conn = Connection::open(&scan_db)?;
    let report = scanner::scan_database(&scan_conn, &id_sets)?;

    if report.is_empty() {
        println!("No id occurrences found in {}", scan_db.display());
        return Ok(());
    }

    println!("{:<30}  {:<20}  {}", "TABLE", "COLUMN", "TAGS");
    println!("{}", "-".repeat(80));
    for row in &report {
        println!("{:<30}  {:<20}  {}", row.table, row.column, row.tags.join(", "));
    }

    Ok(())
}
