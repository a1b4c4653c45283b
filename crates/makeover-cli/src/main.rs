use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "makeover")]
#[command(about = "Makeover CLI - AI portrait composition with iterative edits", long_about = None)]
struct Cli {
    /// Keep config, secrets, logs and exports under this directory
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a makeover in one go: upload, generate, apply edits, download
    Generate(commands::generate::GenerateArgs),
    /// Start an interactive session
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = cli.base_dir.as_deref();

    match cli.command {
        Commands::Generate(args) => commands::generate::run(base_dir, args).await?,
        Commands::Repl => commands::repl::run(base_dir).await?,
    }

    Ok(())
}
