// NOTE: rotalyze CLI layout
//
// - args: clap definitions only, no behavior
// - handlers: one module per subcommand; load input, call the engine, hand a view to a renderer
// - presentation: views serialize unchanged for `--format json` and implement Display for plain text
// - services: file outputs (resource ledger CSV)
//
// The engine never prints. Everything user-visible goes through a renderer,
// diagnostics go through `tracing` on stderr.

mod args;
mod commands;
pub mod context;
mod handlers;
mod logging;
pub mod presentation;
mod services;
pub mod session_loader;
pub mod types;

pub use args::{AnalyzeArgs, Cli, Commands, RunArgs};
pub use commands::run;

use rotalyze_engine::EngineError;

/// Process exit code for a failed command: configuration errors are 2, the rest 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<EngineError>()
        .map_or(1, EngineError::exit_code)
}
