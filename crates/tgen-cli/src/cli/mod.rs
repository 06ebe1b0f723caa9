//! CLI for the tgen traffic generator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tgen_core::{config, logging};

use commands::{run_check, run_generator, run_init};

/// How long process exit waits for blocking transfer workers.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Multi-threaded runtime the binary runs on. Built by hand (not `#[tokio::main]`)
/// so shutdown can be bounded with [`SHUTDOWN_GRACE`].
pub fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

/// Top-level CLI for the tgen traffic generator.
#[derive(Debug, Parser)]
#[command(name = "tgen")]
#[command(about = "tgen: rate-limited synthetic download traffic", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/tgen/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write diagnostics to <DIR>/tgen.log instead of stderr.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Generate traffic until interrupted (Ctrl-C).
    Run,

    /// Load and validate the config, then print the endpoint pool.
    Check,

    /// Write a default config file if none exists.
    Init,
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // Initialize logging as early as possible.
        match &cli.log_dir {
            Some(dir) => {
                if let Err(e) = logging::init_logging(dir) {
                    logging::init_logging_stderr();
                    tracing::warn!("file logging unavailable ({:#}), using stderr", e);
                }
            }
            None => logging::init_logging_stderr(),
        }

        let config_path = match cli.config {
            Some(path) => path,
            None => config::config_path()?,
        };

        match cli.command {
            CliCommand::Run => run_generator(&config_path).await?,
            CliCommand::Check => run_check(&config_path)?,
            CliCommand::Init => run_init(&config_path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
