//! Combat-event analysis engine.
//!
//! Normalized events are dispatched in order to analysis modules. Modules
//! declare their dependencies, share state through [`Shared`] handles, track
//! resources and timed effects, and turn what they saw into metrics,
//! suggestions and per-event annotations.
//!
//! ```no_run
//! use rotalyze_engine::{AnalysisConfig, analyze};
//! use rotalyze_types::{ActorId, RunContext, parse_events};
//!
//! # fn main() -> anyhow::Result<()> {
//! let events = parse_events(&std::fs::read_to_string("events.json")?)?;
//! let run = RunContext::new(ActorId(1), 0, 300_000);
//! let report = analyze(events, &run, &AnalysisConfig::load_from("rotalyze.toml".as_ref())?)?;
//! for suggestion in report.suggestions() {
//!     println!("{}: {}", suggestion.module, suggestion.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod module;
pub mod modules;
pub mod performance;
pub mod registry;
pub mod report;
pub mod resources;
pub mod suggestions;
pub mod timed_effect;
pub mod window;

pub use analysis::{AnalysisOutcome, Analyzer, analyze, default_registry};
pub use config::{AnalysisConfig, Policy, ResourceSpec};
pub use diagnostics::{
    CollectingSink, DataQualityNote, DiagnosticSink, Diagnostics, NoteKind, NullSink, TracingSink,
};
pub use dispatcher::{ActorRole, Dispatcher, EventFilter, HandlerContext};
pub use error::{EngineError, Result};
pub use module::{Dependency, Module, ModuleContext, Shared};
pub use performance::{PerformanceThresholds, QualitativePerformance, SubCheck};
pub use registry::{ModuleGraph, Registry};
pub use report::{AnalysisReport, MetricValue, ModuleReport, ReportBuilder};
pub use resources::{LedgerEntry, ResourceTracker};
pub use suggestions::{Suggestion, SuggestionSeverity, SuggestionThresholds, ThresholdSpec};
pub use timed_effect::{RefreshKind, RefreshRules, TimedEffectTracker};
pub use window::{OrderingRule, WindowTracker};
