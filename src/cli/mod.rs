//! CLI module for Subforge
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config_initialization::CliOverrides;

pub mod args;
pub mod commands;

pub use args::{ClassifyArgs, ConfigArgs, FormatArg, RenderArgs, RunArgs, StylesArgs};

/// Subforge - styled word-by-word subtitles burned into video
#[derive(Parser, Debug)]
#[command(name = "subforge")]
#[command(about = "Render styled, word-highlighted subtitles and burn them into videos")]
#[command(version)]
pub struct Cli {
    /// Settings file (default: ./subforge.toml or the user config dir)
    #[arg(long, global = true, env = "SUBFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level or filter directive
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the style presets
    Styles(StylesArgs),
    /// Show the orientation and layout chosen for a canvas size
    Classify(ClassifyArgs),
    /// Build a subtitle script from a word timing file
    Render(RenderArgs),
    /// Transcribe, render and burn subtitles into a video
    Run(RunArgs),
    /// Show the effective settings as TOML
    Config(ConfigArgs),
}

impl Cli {
    /// Command-line values that override configured settings
    pub fn overrides(&self) -> CliOverrides {
        let (max_workers, output_dir) = match &self.command {
            Commands::Run(run) => (run.workers, run.output_dir.clone()),
            _ => (None, None),
        };
        CliOverrides {
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
            max_workers,
            output_dir,
        }
    }
}
