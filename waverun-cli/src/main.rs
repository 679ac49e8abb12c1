//! waverun CLI - validate plans and preview their wave schedule.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use waverun_engine::observability::{TracingConfig, init_tracing};

/// waverun - dependency-aware wave scheduler.
#[derive(Parser)]
#[command(name = "waverun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a plan file (YAML, or JSON by extension)
    Validate {
        /// Path to the plan file
        file: String,
    },

    /// Print the wave schedule of a plan
    Schedule {
        /// Path to the plan file
        file: String,

        /// Override the maximum number of items per wave
        #[arg(short = 'p', long)]
        max_parallel: Option<usize>,

        /// Print the waves as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Filter implied by `-v`; `None` keeps the environment's filter.
fn verbosity_filter(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn setup_logging(verbosity: u8) -> Result<()> {
    let config = TracingConfig::from_env();
    let config = match verbosity_filter(verbosity) {
        Some(filter) => config.with_log_filter(filter),
        None => config,
    };
    init_tracing(&config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Validate { file } => commands::validate::run(&file),
        Commands::Schedule {
            file,
            max_parallel,
            json,
        } => commands::schedule::run(&file, max_parallel, json),
    }
}
