use crate::args::RunArgs;
use anyhow::Result;
use rotalyze_engine::{AnalysisConfig, EngineError};
use rotalyze_types::{ActorId, Event, RunContext};
use std::path::{Path, PathBuf};

/// Configuration of one CLI invocation plus the run overrides given on the command line.
pub struct ExecutionContext {
    config_path: PathBuf,
    config: AnalysisConfig,
    overrides: RunArgs,
}

impl ExecutionContext {
    pub fn load(config_path: &Path, overrides: RunArgs) -> Result<Self> {
        let config = AnalysisConfig::load_from(config_path)?;
        if !config_path.exists() {
            tracing::warn!(path = %config_path.display(), "config file not found, using defaults");
        }
        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            overrides,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Run context from `[run]` with command-line overrides applied.
    ///
    /// Without a `[run]` table the player must be given and the fight spans
    /// the first to the last event.
    pub fn run_context(&self, events: &[Event]) -> Result<RunContext, EngineError> {
        let run = resolve_run(self.config.run.as_ref(), &self.overrides, events);
        let Some(run) = run else {
            return Err(self.invalid("no [run] table; add one or pass --player"));
        };
        if run.fight_end < run.fight_start {
            return Err(self.invalid(format!(
                "fight ends at {}ms, before it starts at {}ms",
                run.fight_end, run.fight_start
            )));
        }
        Ok(run)
    }

    fn invalid(&self, reason: impl Into<String>) -> EngineError {
        EngineError::Config {
            path: self.config_path.clone(),
            reason: reason.into(),
        }
    }
}

fn resolve_run(
    configured: Option<&RunContext>,
    overrides: &RunArgs,
    events: &[Event],
) -> Option<RunContext> {
    let mut run = match (configured, overrides.player) {
        (Some(run), _) => run.clone(),
        (None, Some(player)) => {
            let start = events.first().map_or(0, |e| e.timestamp);
            let end = events.last().map_or(start, |e| e.timestamp);
            RunContext::new(ActorId(player), start, end)
        }
        (None, None) => return None,
    };

    if let Some(player) = overrides.player {
        run.selected_player = ActorId(player);
    }
    if let Some(start) = overrides.fight_start {
        run.fight_start = start;
    }
    if let Some(end) = overrides.fight_end {
        run.fight_end = end;
    }
    Some(run)
}
