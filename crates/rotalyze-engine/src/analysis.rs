use rotalyze_normalizers::build_chain;
use rotalyze_types::{Annotations, Event, RunContext};
use std::rc::Rc;

use crate::config::AnalysisConfig;
use crate::diagnostics::{DiagnosticSink, Diagnostics, TracingSink};
use crate::error::Result;
use crate::modules;
use crate::registry::{ModuleGraph, Registry};
use crate::report::{AnalysisReport, AnnotatedEvent};

/// Registry with every built-in module requested.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    modules::request_all(&mut registry);
    registry
}

/// One configured analysis: normalize, construct modules, dispatch, report.
pub struct Analyzer {
    registry: Registry,
    config: AnalysisConfig,
    sink: Rc<dyn DiagnosticSink>,
}

/// Report plus the constructed modules, for callers that want to query them.
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub events: Vec<Event>,
    pub modules: ModuleGraph,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            registry: default_registry(),
            config,
            sink: Rc::new(TracingSink),
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sink(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, events: Vec<Event>, run: &RunContext) -> Result<AnalysisOutcome> {
        let chain = build_chain(&self.config.normalizers);
        let events = chain.run(events, run)?;

        let diagnostics = Diagnostics::new(Rc::clone(&self.sink), self.config.diagnostics.debug);
        let mut graph = self.registry.build(run, &self.config, &diagnostics)?;
        tracing::info!(
            modules = graph.names().len(),
            active = graph.active_count(),
            events = events.len(),
            "starting analysis"
        );

        let mut annotations = Annotations::new();
        graph.dispatcher().run(&events, run, &mut annotations)?;

        let report = AnalysisReport {
            context: run.clone(),
            events_analyzed: events.len(),
            fabricated_events: events.iter().filter(|e| e.fabricated).count(),
            modules: graph.reports(run),
            annotations: annotations
                .iter()
                .filter_map(|(index, meta)| {
                    let event = events.get(index)?;
                    Some(AnnotatedEvent {
                        index,
                        timestamp: event.timestamp,
                        kind: event.kind(),
                        ability: event.ability,
                        meta: meta.clone(),
                    })
                })
                .collect(),
            notes: diagnostics.notes(),
        };

        Ok(AnalysisOutcome {
            report,
            events,
            modules: graph,
        })
    }
}

/// Run the built-in modules over `events` and return the report.
pub fn analyze(
    events: Vec<Event>,
    run: &RunContext,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    Ok(Analyzer::new(config.clone()).run(events, run)?.report)
}
