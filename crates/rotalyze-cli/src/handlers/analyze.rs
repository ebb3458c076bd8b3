use crate::args::AnalyzeArgs;
use crate::context::ExecutionContext;
use crate::presentation::views::ReportView;
use crate::presentation::{ConsoleRenderer, Palette, Renderer};
use crate::services::writer;
use crate::session_loader;
use crate::types::{ColorMode, OutputFormat};
use anyhow::Result;
use rotalyze_engine::analyze;

pub fn handle(args: AnalyzeArgs, format: OutputFormat, color: ColorMode) -> Result<()> {
    let mut ctx = ExecutionContext::load(&args.config, args.run)?;
    if args.debug_modules {
        ctx.config_mut().diagnostics.debug = true;
    }

    let events = session_loader::load_events(&args.events)?;
    let run = ctx.run_context(&events)?;
    let report = analyze(events, &run, ctx.config())?;

    if let Some(path) = &args.ledger_csv {
        let rows = writer::write_ledger_csv(path, &report)?;
        tracing::info!(path = %path.display(), rows, "wrote resource ledger");
    }

    let renderer = ConsoleRenderer::new(format);
    renderer.render(&ReportView::new(&report, Palette::new(color.enabled())))?;
    Ok(())
}
