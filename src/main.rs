use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use code_rag::commands::{ask, chat, index_codebase, show_status};
use code_rag::config::{Config, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "code-rag")]
#[command(about = "Ask questions about a source tree using a local Ollama-backed index")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the persisted indexes
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and indexing settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Rebuild the index from the source tree
    Index {
        /// Override the configured source root
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,
    },
    /// Ask questions interactively (default)
    Chat,
    /// Show index and Ollama status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => Config::default_base_dir().context("Failed to determine base directory")?,
    };

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Config { show } => {
            if show {
                show_config(&Config::load(&base_dir)?)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Index { root } => {
            let mut config = Config::load(&base_dir)?;
            if let Some(root) = root {
                config.scan.root = root;
            }
            index_codebase(config)?;
        }
        Commands::Ask { question } => {
            ask(Config::load(&base_dir)?, &question)?;
        }
        Commands::Chat => {
            chat(Config::load(&base_dir)?)?;
        }
        Commands::Status => {
            show_status(&Config::load(&base_dir)?)?;
        }
    }

    Ok(())
}
