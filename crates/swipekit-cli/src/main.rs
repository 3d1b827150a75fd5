use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swipekit_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "swipekit")]
#[command(author, version, about = "Replay recorded gesture traces through a swipe engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.config/swipekit/config.toml
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a gesture trace and print every listener event
    Replay {
        /// Trace file (.json or .toml)
        path: PathBuf,
        /// Wait between steps and frames as the trace's timestamps say
        #[arg(long)]
        realtime: bool,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// List consumer kinds and their settings
    Presets,
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration; `config init` and `config path` work without a valid file
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Initialize logging
    let default_level = config
        .as_ref()
        .map(|c| c.general.log_level.clone())
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or(default_level),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.unwrap_or_else(AppConfig::config_path);

    match cli.command {
        Commands::Replay { path, realtime, json } => {
            commands::replay::run(&config?, &path, realtime, json).await
        }
        Commands::Presets => commands::presets::run(&config?).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config?).await,
            ConfigAction::Init { force } => commands::config::init(&config_path, force).await,
            ConfigAction::Path => commands::config::path(&config_path).await,
        },
    }
}
