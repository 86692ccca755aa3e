//! Storyloom CLI - turn a handful of images into a narrated short story.
//!
//! # Usage
//!
//! ```bash
//! # Write and narrate a story from three photos
//! storyloom generate beach.jpg pier.png sunset.jpg --genre mystery --words 150
//!
//! # Use Groq for the story and keep the files somewhere else
//! storyloom generate *.png --text-backend groq --output-dir ./out
//!
//! # Guided mode
//! storyloom
//!
//! # View configuration
//! storyloom config show
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;

mod cli;
mod logging;

/// Storyloom - turn a handful of images into a narrated short story.
#[derive(Parser, Debug)]
#[command(name = "storyloom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a story and its narration from images
    Generate(cli::generate::GenerateArgs),

    /// Manage the local speech model assets
    Assets(cli::assets::AssetsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // API keys may live in a .env file next to where storyloom runs
    let dotenv_path = dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match storyloom_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `storyloom config path`."
            );
            storyloom_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Storyloom v{}", storyloom_core::VERSION);
    if let Some(path) = dotenv_path {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Some(Commands::Generate(args)) => cli::generate::execute(args, config).await,
        Some(Commands::Assets(args)) => cli::assets::execute(args, &config).await,
        Some(Commands::Config(args)) => cli::config::execute(args).await,
        None if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() => {
            cli::interactive::run(&config).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
