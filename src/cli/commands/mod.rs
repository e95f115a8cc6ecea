//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod ids;
mod process;
mod run;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

pub use scrape::ScrapeArgs;

#[derive(Parser)]
#[command(name = "taxscrape")]
#[command(about = "Property tax record scraper")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every identifier in the id list
    Scrape(ScrapeArgs),

    /// Build the id list from a CSV export of the appraisal roll
    Ids {
        /// CSV export holding the identifier column
        #[arg(long)]
        input: PathBuf,
        /// Identifier column name
        #[arg(long, default_value = "QuickRef")]
        column: String,
        /// Keep only identifiers with this prefix
        #[arg(long, default_value = "R")]
        prefix: String,
        /// Id list to write (default: <data_dir>/id_list.txt)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Turn raw results into the processed table
    Process {
        /// Raw results CSV (default: <data_dir>/tax_results.csv)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Processed CSV (default: <data_dir>/processed_results.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Scrape, process, and print a summary
    Run {
        /// Rebuild the id list from this roll export first
        #[arg(long)]
        roll: Option<PathBuf>,
        /// Identifier column name in the roll export
        #[arg(long, default_value = "QuickRef")]
        column: String,
        /// Keep only identifiers with this prefix
        #[arg(long, default_value = "R")]
        prefix: String,
        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print the effective settings as TOML
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (settings, config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Scrape(args) => {
            scrape::cmd_scrape(&settings, &args).await?;
            Ok(())
        }
        Commands::Ids {
            input,
            column,
            prefix,
            output,
        } => {
            ids::cmd_ids(&settings, &input, &column, &prefix, output.as_deref())?;
            Ok(())
        }
        Commands::Process { input, output } => {
            process::cmd_process(&settings, input.as_deref(), output.as_deref())?;
            Ok(())
        }
        Commands::Run {
            roll,
            column,
            prefix,
            no_progress,
        } => {
            let roll = roll.as_deref().map(|path| run::RollExport {
                path,
                column: &column,
                prefix: &prefix,
            });
            run::cmd_run(&settings, roll, !no_progress).await
        }
        Commands::Config => config_cmd::cmd_config_show(&settings, &config),
    }
}
