//! CLI module for RAG Matrix
//!
//! - `serve`: run the HTTP service
//! - `reclaim`: remove storage left behind by interrupted creates and deletes
//! - `list`: print registered pipeline ids

pub mod maintenance;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// RAG Matrix - pipeline lifecycle and retrieval registry
#[derive(Parser)]
#[command(name = "rag-matrix")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve,

    /// Destroy storage namespaces that have no registry entry
    Reclaim {
        /// Only report orphans, remove nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Print registered pipeline ids
    List,
}

/// Loads `.env`, the layered configuration and the log subscriber
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["rag-matrix", "reclaim", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Command::Reclaim { dry_run: true }));

        let cli = Cli::try_parse_from(["rag-matrix", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));

        assert!(Cli::try_parse_from(["rag-matrix", "bogus"]).is_err());
    }
}
