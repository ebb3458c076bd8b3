use super::args::{Cli, Commands};
use super::handlers;
use crate::logging;
use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_level);

    match cli.command {
        Commands::Analyze(args) => handlers::analyze::handle(args, cli.format, cli.color),
        Commands::CheckConfig { config, run } => {
            handlers::check_config::handle(&config, run, cli.format, cli.color)
        }
    }
}
