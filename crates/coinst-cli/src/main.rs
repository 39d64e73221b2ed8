use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod completion;
mod config;
mod core_flows;
mod dispatch;
mod render;

use completion::CliCompletionShell;

#[derive(Parser, Debug)]
#[command(name = "coinst")]
#[command(about = "Debian co-installability checker and migration simulator", long_about = None)]
pub(crate) struct Cli {
    /// TOML file with default architectures and solver settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print unadorned lines even when stdout is a terminal.
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Report the packages that cannot be installed on each architecture.
    Check {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long = "arch")]
        arches: Vec<String>,
        #[arg(long)]
        include_arch_all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print every binary package of one architecture with its version.
    List {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        arch: String,
    },
    /// Try planner operations (`src`, `src/arch`, `-src`) against a testing tree.
    Migrate {
        #[arg(long)]
        testing: PathBuf,
        #[arg(long)]
        unstable: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long = "arch")]
        arches: Vec<String>,
        #[arg(long)]
        json: bool,
        #[arg(required = true, allow_hyphen_values = true)]
        ops: Vec<String>,
    },
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    dispatch::run_cli(Cli::parse())
}
