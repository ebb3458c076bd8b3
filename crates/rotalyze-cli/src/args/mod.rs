mod commands;

pub use commands::*;

use crate::types::{ColorMode, LogLevel, OutputFormat};
use clap::Parser;

#[derive(Parser)]
#[command(name = "rotalyze")]
#[command(
    about = "Analyze recorded combat sessions for rotation, resource and cooldown usage",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}
