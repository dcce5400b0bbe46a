mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_day, cmd_delete, cmd_edit, cmd_export, cmd_import, cmd_log, cmd_period,
    cmd_product_add, cmd_product_common, cmd_product_search, cmd_total,
};
use crate::config::Config;
use nosh_core::DatabaseFacade;
use nosh_core::db::Database;
use nosh_core::facade::DEFAULT_MOST_COMMON_LIMIT;

#[derive(Parser)]
#[command(
    name = "nosh",
    version,
    about = "A small, local-first food and calorie log"
)]
struct Cli {
    /// Path to the database file (default: per-user data directory)
    #[arg(long, global = true, env = "NOSH_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a consumed item
    Log {
        /// Name of the item
        name: String,
        /// Amount consumed, in units of the product's energy
        amount: i64,
        /// Energy per unit (kcal); required unless --product-id is given
        #[arg(short, long)]
        energy: Option<f64>,
        /// Log against an existing product instead of creating one (0 creates one)
        #[arg(long)]
        product_id: Option<i64>,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a logged entry by ID
    Delete {
        /// Entry ID to delete
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the amount of a logged entry
    Edit {
        /// Entry ID to edit
        entry_id: i64,
        /// New amount
        amount: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage products
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Show the entries of one day (defaults to today)
    Day {
        /// Date to show (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show calories per day for a period
    Period {
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day, inclusive (YYYY-MM-DD)
        end: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the total calories of a period
    Total {
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day, inclusive (YYYY-MM-DD)
        end: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the entries of a period as CSV
    Export {
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day, inclusive (YYYY-MM-DD)
        end: String,
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Import entries from a CSV file (Date,Name,Amount,Energy[,Barcode])
    Import {
        /// Path to the CSV file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProductCommands {
    /// Add a product
    Add {
        /// Product name
        name: String,
        /// Energy per unit (kcal)
        #[arg(short, long)]
        energy: f64,
        /// Barcode
        #[arg(long)]
        barcode: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find products whose name contains a term
    Search {
        /// Search term
        term: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the most frequently logged products
    Common {
        /// Maximum number of products to list
        #[arg(short, long, default_value_t = DEFAULT_MOST_COMMON_LIMIT)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("NOSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    tracing::debug!(path = %config.db_path.display(), "opening database");
    let db = Database::open(&config.db_path)?;
    let mut facade = DatabaseFacade::new(db);

    match cli.command {
        Commands::Log {
            name,
            amount,
            energy,
            product_id,
            date,
            json,
        } => cmd_log(&mut facade, &name, amount, energy, product_id, date, json),
        Commands::Delete { entry_id, json } => cmd_delete(&facade, entry_id, json),
        Commands::Edit {
            entry_id,
            amount,
            json,
        } => cmd_edit(&facade, entry_id, amount, json),
        Commands::Product { command } => match command {
            ProductCommands::Add {
                name,
                energy,
                barcode,
                json,
            } => cmd_product_add(&facade, &name, energy, barcode, json),
            ProductCommands::Search { term, json } => cmd_product_search(&facade, &term, json),
            ProductCommands::Common { limit, json } => {
                let facade = facade.with_most_common_limit(limit);
                cmd_product_common(&facade, json)
            }
        },
        Commands::Day { date, json } => cmd_day(&facade, date, json),
        Commands::Period { start, end, json } => cmd_period(&facade, start, end, json),
        Commands::Total { start, end, json } => cmd_total(&facade, start, end, json),
        Commands::Export { start, end, output } => cmd_export(&facade, start, end, output),
        Commands::Import {
            file,
            dry_run,
            json,
        } => cmd_import(&mut facade, &file, dry_run, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_log_with_global_db() {
        let cli = Cli::try_parse_from([
            "nosh", "log", "Banana", "2", "--energy", "89", "--db", "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Commands::Log {
                name,
                amount,
                energy,
                product_id,
                ..
            } => {
                assert_eq!(name, "Banana");
                assert_eq!(amount, 2);
                assert_eq!(energy, Some(89.0));
                assert_eq!(product_id, None);
            }
            _ => panic!("expected log command"),
        }
    }

    #[test]
    fn test_parse_product_common_default_limit() {
        let cli = Cli::try_parse_from(["nosh", "product", "common"]).unwrap();
        match cli.command {
            Commands::Product {
                command: ProductCommands::Common { limit, json },
            } => {
                assert_eq!(limit, DEFAULT_MOST_COMMON_LIMIT);
                assert!(!json);
            }
            _ => panic!("expected product common command"),
        }
    }
}
