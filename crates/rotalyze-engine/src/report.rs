use rotalyze_types::{AbilityId, EventKind, EventMeta, RunContext, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::diagnostics::DataQualityNote;
use crate::performance::QualitativePerformance;
use crate::suggestions::{Suggestion, ThresholdSpec};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Count(u64),
    Amount(i64),
    Ratio(f64),
    Decimal(f64),
    DurationMs(u64),
    Performance(QualitativePerformance),
    Detail(serde_json::Value),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Count(v) | MetricValue::DurationMs(v) => Some(*v as f64),
            MetricValue::Amount(v) => Some(*v as f64),
            MetricValue::Ratio(v) | MetricValue::Decimal(v) => Some(*v),
            MetricValue::Performance(_) | MetricValue::Detail(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            MetricValue::Count(v) => v.to_string(),
            MetricValue::Amount(v) => v.to_string(),
            MetricValue::Ratio(v) => rotalyze_types::format_percentage(*v),
            MetricValue::Decimal(v) => format!("{v:.2}"),
            MetricValue::DurationMs(v) => rotalyze_types::format_duration(*v),
            MetricValue::Performance(p) => p.to_string(),
            MetricValue::Detail(v) => v.to_string(),
        }
    }
}

impl From<QualitativePerformance> for MetricValue {
    fn from(value: QualitativePerformance) -> Self {
        MetricValue::Performance(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleReport {
    pub module: String,
    pub active: bool,
    pub metrics: BTreeMap<String, MetricValue>,
    pub suggestions: Vec<Suggestion>,

    /// Bulky machine-readable output (ledgers, per-window breakdowns)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attachments: BTreeMap<String, serde_json::Value>,
}

impl ModuleReport {
    pub fn new(module: &str, active: bool) -> Self {
        Self {
            module: module.to_string(),
            active,
            metrics: BTreeMap::new(),
            suggestions: Vec::new(),
            attachments: BTreeMap::new(),
        }
    }

    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }
}

/// Handed to `Module::report` to fill in one module's section.
pub struct ReportBuilder<'a> {
    run: &'a RunContext,
    report: ModuleReport,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(run: &'a RunContext, module: &str, active: bool) -> Self {
        Self {
            run,
            report: ModuleReport::new(module, active),
        }
    }

    pub fn run(&self) -> &RunContext {
        self.run
    }

    /// Fight length in minutes, for per-minute rates.
    pub fn fight_minutes(&self) -> f64 {
        self.run.fight_duration() as f64 / 60_000.0
    }

    pub fn metric(&mut self, name: &str, value: MetricValue) -> &mut Self {
        self.report.metrics.insert(name.to_string(), value);
        self
    }

    pub fn count(&mut self, name: &str, value: usize) -> &mut Self {
        self.metric(name, MetricValue::Count(value as u64))
    }

    pub fn ratio(&mut self, name: &str, value: f64) -> &mut Self {
        self.metric(name, MetricValue::Ratio(value))
    }

    pub fn performance(&mut self, name: &str, value: QualitativePerformance) -> &mut Self {
        self.metric(name, value.into())
    }

    /// Add a suggestion when `spec` crosses its minor threshold.
    pub fn suggest(&mut self, spec: &ThresholdSpec, message: impl Into<String>) -> &mut Self {
        if let Some(suggestion) = Suggestion::from_threshold(&self.report.module, spec, message) {
            self.report.suggestions.push(suggestion);
        }
        self
    }

    pub fn attach(&mut self, name: &str, value: impl Serialize) -> &mut Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.report.attachments.insert(name.to_string(), value);
            }
            Err(e) => tracing::warn!(module = %self.report.module, name, "attachment dropped: {e}"),
        }
        self
    }

    pub fn finish(self) -> ModuleReport {
        self.report
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedEvent {
    pub index: usize,
    pub timestamp: Timestamp,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ability: Option<AbilityId>,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub context: RunContext,
    pub events_analyzed: usize,
    pub fabricated_events: usize,
    pub modules: Vec<ModuleReport>,
    pub annotations: Vec<AnnotatedEvent>,
    pub notes: Vec<DataQualityNote>,
}

impl AnalysisReport {
    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.module == name)
    }

    pub fn suggestions(&self) -> impl Iterator<Item = &Suggestion> {
        self.modules.iter().flat_map(|m| m.suggestions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestions::SuggestionThresholds;
    use rotalyze_types::ActorId;

    #[test]
    fn test_builder_collects_metrics_and_suggestions() {
        let run = RunContext::new(ActorId(1), 0, 120_000);
        let mut builder = ReportBuilder::new(&run, "active_time", true);
        builder
            .ratio("active_ratio", 0.8)
            .suggest(
                &ThresholdSpec::less_than(0.8, SuggestionThresholds::new(0.95, 0.85, 0.75)),
                "Try to reduce downtime",
            )
            .suggest(
                &ThresholdSpec::less_than(0.99, SuggestionThresholds::new(0.95, 0.85, 0.75)),
                "never shown",
            );
        assert_eq!(builder.fight_minutes(), 2.0);

        let report = builder.finish();
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.suggestions[0].module, "active_time");
        assert_eq!(report.metric("active_ratio"), Some(&MetricValue::Ratio(0.8)));
    }

    #[test]
    fn test_metric_serialization() {
        let value = serde_json::to_value(MetricValue::Performance(QualitativePerformance::Good))
            .unwrap();
        assert_eq!(value, serde_json::json!({"kind": "performance", "value": "good"}));
        assert_eq!(MetricValue::Ratio(0.5).render(), "50.00%");
    }
}
