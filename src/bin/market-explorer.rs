//! market-explorer CLI - filtered transaction dumps and five-day-yang screening
//!
//! ## Example Usage
//!
//! ```bash
//! # List index and concept filter values
//! market-explorer --db market_data.db options
//!
//! # Rows for two indices over January
//! market-explorer range --start 2024-01-01 --end 2024-01-31 --index SSE --index SZSE
//!
//! # Five-day-yang symbols up to a date, as CSV
//! market-explorer --format csv yang --end 2024-04-08 --concept Robotics
//! ```

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use market_explorer::config::{ExplorerConfig, OutputFormat};
use market_explorer::engine::QueryEngine;
use market_explorer::error::ExplorerError;
use market_explorer::report;
use market_explorer::store::SqliteStore;
use market_explorer::universe::Universe;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// market-explorer: query a daily stock transaction history
#[derive(Parser)]
#[command(name = "market-explorer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Filter daily stock transactions and screen for the five-day-yang pattern", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format: table, csv or json
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Write results to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available index and concept filter values
    Options,

    /// Rows between two dates (inclusive)
    Range {
        /// Start date (YYYY-MM-DD), default: end minus the configured lookback
        #[arg(short = 's', long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD), default: today
        #[arg(short = 'e', long)]
        end: Option<NaiveDate>,

        #[command(flatten)]
        filters: Filters,
    },

    /// Symbols whose last six trading days up to END form a five-day-yang
    Yang {
        /// End date, i.e. day 5 (YYYY-MM-DD), default: today
        #[arg(short = 'e', long)]
        end: Option<NaiveDate>,

        #[command(flatten)]
        filters: Filters,
    },
}

#[derive(clap::Args)]
struct Filters {
    /// Restrict to members of this index (repeatable)
    #[arg(short = 'i', long = "index", value_name = "INDEX")]
    indices: Vec<String>,

    /// Restrict to members of this concept name (repeatable)
    #[arg(short = 'k', long = "concept", value_name = "CONCEPT")]
    concepts: Vec<String>,
}

/// Config file search: explicit path, then ~/.market-explorer/config.toml
fn load_config(path: Option<&Path>) -> anyhow::Result<ExplorerConfig> {
    if path.is_some() {
        return Ok(ExplorerConfig::load(path)?);
    }
    if let Some(home) = dirs::home_dir() {
        let default_config = home.join(".market-explorer").join("config.toml");
        if default_config.exists() {
            return ExplorerConfig::load(Some(&default_config))
                .with_context(|| format!("loading {}", default_config.display()));
        }
    }
    Ok(ExplorerConfig::default())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database = db;
    }
    let format = cli.format.unwrap_or(config.output);

    if cli.verbose {
        eprintln!(
            "{} v{}",
            "market-explorer".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        eprintln!(
            "Database: {}",
            config.database.display().to_string().dimmed()
        );
    }

    let store = SqliteStore::open_read_only(&config.database)?;
    let engine = QueryEngine::new(config.engine_config(), Arc::new(store));
    let today = Local::now().date_naive();

    let mut sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    match cli.command {
        Commands::Options => {
            writeln!(sink, "{}", "Index".cyan().bold())?;
            for index in engine.index_options()? {
                writeln!(sink, "  {}", index)?;
            }
            writeln!(sink, "{}", "Concept".cyan().bold())?;
            for concept in engine.concept_options()? {
                writeln!(sink, "  {}", concept)?;
            }
        }

        Commands::Range {
            start,
            end,
            filters,
        } => {
            let end = end.unwrap_or(today);
            let start = match start {
                Some(start) => start,
                None => config.range_start(end)?,
            };
            if start > end {
                return Err(ExplorerError::InvalidDateRange { start, end }.into());
            }

            let Some(universe) = resolve(&engine, &filters)? else {
                return Ok(());
            };
            let rows = engine.query_range(start, end, &universe)?;

            eprintln!(
                "{} transactions from {} symbols between {} and {}.",
                rows.len().to_string().bold(),
                universe.to_string().bold(),
                start.to_string().bold(),
                end.to_string().bold()
            );
            report::render(&mut sink, &rows, format)?;
        }

        Commands::Yang { end, filters } => {
            let cutoff = end.unwrap_or(today);

            let Some(universe) = resolve(&engine, &filters)? else {
                return Ok(());
            };
            let rows = engine.query_five_day_yang(cutoff, &universe)?;

            if rows.is_empty() {
                eprintln!(
                    "{} No symbols satisfy Index/Concept filters and the five-day-yang pattern.",
                    "Warning:".yellow()
                );
                return Ok(());
            }
            eprintln!(
                "Five-day-yang symbols found: {} (summary for each up to {}).",
                rows.len().to_string().bold(),
                cutoff.to_string().bold()
            );
            report::render(&mut sink, &rows, format)?;
        }
    }

    sink.flush()?;
    Ok(())
}

/// Resolve filters, returning `None` after a warning when nothing matches
fn resolve(engine: &QueryEngine, filters: &Filters) -> anyhow::Result<Option<Universe>> {
    let universe = engine.resolve_universe(&filters.indices, &filters.concepts)?;
    if universe.is_empty() {
        eprintln!(
            "{} No symbols satisfy the chosen Index + Concept filters.",
            "Warning:".yellow()
        );
        return Ok(None);
    }
    Ok(Some(universe))
}
