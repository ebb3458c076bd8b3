use crate::args::RunArgs;
use crate::context::ExecutionContext;
use crate::presentation::views::{ConfigSummaryView, ModuleStatus};
use crate::presentation::{ConsoleRenderer, Palette, Renderer};
use crate::types::{ColorMode, OutputFormat};
use anyhow::Result;
use rotalyze_engine::{Diagnostics, default_registry};
use rotalyze_normalizers::build_chain;
use rotalyze_types::{ActorId, RunContext};
use std::path::Path;

pub fn handle(
    config_path: &Path,
    overrides: RunArgs,
    format: OutputFormat,
    color: ColorMode,
) -> Result<()> {
    let ctx = ExecutionContext::load(config_path, overrides)?;
    let config = ctx.config();

    let run = match ctx.run_context(&[]) {
        Ok(run) => run,
        Err(_) if config.run.is_none() => {
            tracing::warn!("no [run] table; checking as if no capability were unlocked");
            RunContext::new(ActorId::default(), 0, 0)
        }
        Err(e) => return Err(e.into()),
    };

    // Construction validates every module's settings table.
    let graph = default_registry().build(&run, config, &Diagnostics::detached())?;
    let modules = graph
        .names()
        .into_iter()
        .map(|name| {
            let reason = graph.disabled_reason(name).map(str::to_string);
            ModuleStatus {
                module: name.to_string(),
                active: reason.is_none(),
                reason,
            }
        })
        .collect();

    let view = ConfigSummaryView {
        path: ctx.config_path().display().to_string(),
        found: ctx.config_path().exists(),
        resources: config
            .resources
            .iter()
            .map(|spec| format!("{} (capacity {})", spec.name, spec.capacity(&run)))
            .collect(),
        normalizers: build_chain(&config.normalizers)
            .stage_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        modules,
        palette: Palette::new(color.enabled()),
    };

    ConsoleRenderer::new(format).render(&view)?;
    Ok(())
}
