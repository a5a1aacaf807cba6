use clap::Parser;
use rag_matrix::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Reclaim { dry_run } => cli::maintenance::reclaim(dry_run).await,
        Command::List => cli::maintenance::list().await,
    }
}
