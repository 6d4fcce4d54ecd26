//! Psi Fortress CLI - headless runs and an interactive console.

mod commands;
mod config;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "psi-fortress")]
#[command(author, version, about = "Psi Fortress - a guarded agent population", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: psi.toml in this or a parent directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default psi.toml
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Run a fixed number of ticks without the console
    Run {
        /// Number of ticks to run
        #[arg(short, long, default_value = "100")]
        ticks: u64,

        /// Random seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Inject a stimulus before the first tick (repeatable)
        #[arg(long = "stimulus")]
        stimuli: Vec<String>,

        /// Cycle through the demo stimuli, one every N ticks
        #[arg(long)]
        demo: Option<u64>,

        /// Write the final snapshot as JSON
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Interactive console driven by the background tick loop
    Watch {
        /// Random seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Run { ticks, seed, stimuli, demo, export } => commands::run::run(
            config,
            commands::run::RunOptions {
                ticks,
                seed,
                stimuli,
                demo_every: demo,
                export,
                verbose: cli.verbose,
            },
        ),
        Commands::Watch { seed } => commands::watch::run(config, seed),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
