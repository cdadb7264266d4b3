//! Command-line argument definitions

use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::render::ScriptFormat;
use crate::style::{Color, DEFAULT_STYLE};

/// Arguments for the styles command
#[derive(Args, Debug)]
pub struct StylesArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Video width in pixels
    #[arg(long, allow_negative_numbers = true)]
    pub width: i64,

    /// Video height in pixels
    #[arg(long, allow_negative_numbers = true)]
    pub height: i64,
}

/// Script format on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Ass,
    Srt,
}

impl From<FormatArg> for ScriptFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Ass => ScriptFormat::Ass,
            FormatArg::Srt => ScriptFormat::Srt,
        }
    }
}

/// Arguments for the render command
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Word timing file (JSON)
    #[arg(long)]
    pub words: PathBuf,

    /// Style preset identifier
    #[arg(long, default_value = DEFAULT_STYLE)]
    pub style: String,

    /// Canvas width in pixels
    #[arg(long, allow_negative_numbers = true)]
    pub width: i64,

    /// Canvas height in pixels
    #[arg(long, allow_negative_numbers = true)]
    pub height: i64,

    /// Script file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Script format
    #[arg(long, value_enum, default_value_t = FormatArg::Ass)]
    pub format: FormatArg,

    /// Replace the preset's highlight color (#RRGGBB or &HBBGGRR&)
    #[arg(long)]
    pub highlight_color: Option<Color>,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Style preset identifier
    #[arg(short, long, default_value = DEFAULT_STYLE)]
    pub style: String,

    /// Word timing file to use instead of running a transcriber
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Directory for the rendered video (default: next to the input)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Worker count override
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the effective settings to this file instead of printing them
    #[arg(long)]
    pub write: Option<PathBuf>,
}
