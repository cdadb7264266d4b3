//! Subforge command-line tool
//!
//! # Usage
//!
//! ```bash
//! subforge styles
//! subforge classify --width 1080 --height 1920
//! subforge render --words talk.words.json --style gaming --width 1080 --height 1920 -o talk.ass
//! subforge run --input talk.mp4 --style tiktok_viral
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use subforge_cli::cli::{commands, Cli, Commands};
use subforge_cli::config_initialization::load_settings;
use subforge_cli::utils::logging::init_logging;

/// Main entry point for the Subforge CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_settings(cli.config.as_deref(), &cli.overrides())?;
    init_logging(&loaded.settings.logging)?;
    loaded.log_summary();
    let settings = loaded.settings;

    match cli.command {
        Commands::Styles(args) => commands::styles(args)?,
        Commands::Classify(args) => commands::classify(args, &settings)?,
        Commands::Render(args) => commands::render(args, &settings)?,
        Commands::Run(args) => {
            info!("Executing run command");
            commands::run(args, &settings).await?;
        }
        Commands::Config(args) => commands::config(args, &settings)?,
    }

    Ok(())
}
