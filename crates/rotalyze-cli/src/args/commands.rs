use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the analysis modules over an event file")]
    Analyze(AnalyzeArgs),

    #[command(about = "Validate a configuration file and list the modules it enables")]
    CheckConfig {
        #[arg(long, default_value = "rotalyze.toml")]
        config: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[arg(long, help = "Event file (JSON array or JSON lines)")]
    pub events: PathBuf,

    #[arg(long, default_value = "rotalyze.toml")]
    pub config: PathBuf,

    #[arg(long, help = "Write every resource ledger to this CSV file")]
    pub ledger_csv: Option<PathBuf>,

    #[arg(long, help = "Forward per-window module output to the debug log")]
    pub debug_modules: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Overrides for the `[run]` table of the configuration.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[arg(long, help = "Actor id of the analysed player")]
    pub player: Option<u64>,

    #[arg(long, help = "Encounter start (ms)")]
    pub fight_start: Option<u64>,

    #[arg(long, help = "Encounter end (ms)")]
    pub fight_end: Option<u64>,
}
