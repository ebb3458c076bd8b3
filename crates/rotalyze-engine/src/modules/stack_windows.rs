use rotalyze_types::{AbilityId, CapabilityId, EventKind};
use serde::{Deserialize, Serialize};

use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Module, ModuleContext};
use crate::performance::QualitativePerformance;
use crate::report::{MetricValue, ReportBuilder};
use crate::suggestions::{SuggestionThresholds, ThresholdSpec, ThresholdStyle};
use crate::window::{SubEvent, WindowTracker};

#[derive(Debug, Default, Deserialize)]
struct StackSettings {
    /// Buff that grants the stacks
    buff: AbilityId,
    /// Casts that consume a stack
    consumers: Vec<AbilityId>,
    /// Stacks granted per application
    stacks: u32,
    #[serde(default)]
    requires: Option<CapabilityId>,
    #[serde(default)]
    per_window: Option<SuggestionThresholds>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StackState {
    pub consumed: u32,
}

/// Stack usage per buff application.
pub struct StackWindows {
    settings: StackSettings,
    tracker: WindowTracker<StackState>,
}

impl Module for StackWindows {
    const NAME: &'static str = "stack_windows";

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let settings: Option<StackSettings> = ctx.settings()?;
        let tracker = WindowTracker::new(ctx.diagnostics());
        let Some(settings) = settings else {
            ctx.disable("no stacking buff configured");
            return Ok(Self {
                settings: StackSettings::default(),
                tracker,
            });
        };
        if let Some(capability) = settings.requires
            && !ctx.run().has_capability(capability)
        {
            ctx.disable(format!("{capability} not unlocked"));
            return Ok(Self { settings, tracker });
        }
        anyhow::ensure!(settings.stacks > 0, "stacks must be positive");

        let on_buff = |kind| {
            EventFilter::kind(kind)
                .to(ActorRole::SelectedPlayer)
                .ability(settings.buff)
        };
        ctx.subscribe(on_buff(EventKind::ApplyBuff), Self::on_apply);
        ctx.subscribe(on_buff(EventKind::RefreshBuff), Self::on_refresh);
        ctx.subscribe(on_buff(EventKind::RemoveBuff), Self::on_remove);
        ctx.subscribe(
            EventFilter::cast()
                .by(ActorRole::SelectedPlayer)
                .abilities(settings.consumers.iter().copied()),
            Self::on_consumer,
        );
        ctx.subscribe(EventFilter::fight_end(), Self::on_fight_end);

        Ok(Self { settings, tracker })
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let windows = self.tracker.windows();
        let consumed: u32 = windows.iter().map(|w| w.state.consumed).sum();
        let tier = |p| self.tracker.count_where(|w| w.performance == Some(p));

        report
            .count("windows", windows.len())
            .count("consumed", consumed as usize)
            .count("perfect", tier(QualitativePerformance::Perfect))
            .count("ok", tier(QualitativePerformance::Ok))
            .count("fail", tier(QualitativePerformance::Fail))
            .count("discarded", self.tracker.discarded())
            .attach("windows", windows);
        if windows.is_empty() {
            return;
        }

        let per_window = consumed as f64 / windows.len() as f64;
        let stacks = self.settings.stacks as f64;
        let thresholds = self
            .settings
            .per_window
            .unwrap_or(SuggestionThresholds::new(stacks, stacks - 0.5, stacks - 1.0));
        report
            .metric("per_window", MetricValue::Decimal(per_window))
            .suggest(
                &ThresholdSpec::less_than(per_window, thresholds).style(ThresholdStyle::Decimal),
                format!(
                    "Consume all {} stacks of {} before the buff expires.",
                    self.settings.stacks, self.settings.buff
                ),
            );
    }
}

impl StackWindows {
    /// Every stack used is perfect, one stack left over is ok. There is no
    /// good tier between them.
    fn judge(&self, consumed: u32) -> QualitativePerformance {
        let stacks = self.settings.stacks;
        if consumed >= stacks {
            QualitativePerformance::Perfect
        } else if consumed + 1 == stacks {
            QualitativePerformance::Ok
        } else {
            QualitativePerformance::Fail
        }
    }

    fn close(&mut self, at: u64) {
        let judged = self
            .tracker
            .current()
            .map(|w| self.judge(w.state.consumed));
        if let Some(window) = self.tracker.close(at) {
            window.performance = judged;
        }
    }

    fn on_apply(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.close(ctx.timestamp());
        self.tracker.open(ctx.timestamp(), StackState::default());
        Ok(())
    }

    /// A refresh grants a fresh set of stacks.
    fn on_refresh(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.on_apply(ctx)
    }

    fn on_remove(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.close(ctx.timestamp());
        Ok(())
    }

    fn on_consumer(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if self.tracker.push(SubEvent::from_event(ctx.index, ctx.event))
            && let Some(window) = self.tracker.current_mut()
        {
            window.state.consumed += 1;
        }
        Ok(())
    }

    fn on_fight_end(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.tracker.finish(ctx.timestamp());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::config::AnalysisConfig;
    use crate::registry::Registry;
    use crate::report::ModuleReport;
    use crate::suggestions::SuggestionSeverity;
    use rotalyze_testing::SessionBuilder;
    use rotalyze_types::ActorId;
    use serde_json::json;

    const ICEFURY: AbilityId = AbilityId(210714);
    const FROST_SHOCK: AbilityId = AbilityId(196840);

    fn analyze(builder: SessionBuilder) -> ModuleReport {
        let session = builder.build();
        let config = AnalysisConfig::default().with_module(
            "stack_windows",
            json!({ "buff": 210714, "consumers": [196840], "stacks": 4 }),
        );
        let mut registry = Registry::new();
        registry.request::<StackWindows>();
        let outcome = Analyzer::new(config)
            .with_registry(registry)
            .run(session.events, &session.context)
            .unwrap();
        outcome.report.module("stack_windows").cloned().unwrap()
    }

    fn icefury(builder: SessionBuilder, at: u64, casts: u64) -> SessionBuilder {
        let mut builder = builder.apply_buff(at, ICEFURY);
        for i in 0..casts {
            builder = builder.cast(at + 1_000 * (i + 1), FROST_SHOCK);
        }
        builder.remove_buff(at + 10_000, ICEFURY)
    }

    #[test]
    fn test_stack_tiers() {
        let builder = SessionBuilder::new(ActorId(1)).cast(500, FROST_SHOCK);
        let builder = icefury(builder, 1_000, 4);
        let builder = icefury(builder, 20_000, 3);
        let report = analyze(builder);

        assert_eq!(report.metric("windows"), Some(&MetricValue::Count(2)));
        assert_eq!(report.metric("consumed"), Some(&MetricValue::Count(7)));
        assert_eq!(report.metric("perfect"), Some(&MetricValue::Count(1)));
        assert_eq!(report.metric("ok"), Some(&MetricValue::Count(1)));
        assert_eq!(report.metric("per_window"), Some(&MetricValue::Decimal(3.5)));
        // 3.5 is below 4 but not below 3.5
        assert_eq!(report.suggestions[0].severity, SuggestionSeverity::Minor);
    }

    #[test]
    fn test_locked_module_skips_settings_validation() {
        let session = SessionBuilder::new(ActorId(1))
            .apply_buff(0, ICEFURY)
            .cast(1_000, FROST_SHOCK)
            .build();
        let config = AnalysisConfig::default().with_module(
            "stack_windows",
            json!({ "buff": 210714, "consumers": [196840], "stacks": 0, "requires": 999 }),
        );
        let mut registry = Registry::new();
        registry.request::<StackWindows>();
        let outcome = Analyzer::new(config)
            .with_registry(registry)
            .run(session.events, &session.context)
            .unwrap();

        let report = outcome.report.module("stack_windows").unwrap();
        assert!(!report.active);
        assert!(report.metrics.is_empty());
    }

    #[test]
    fn test_refresh_starts_a_new_window() {
        let builder = SessionBuilder::new(ActorId(1))
            .apply_buff(0, ICEFURY)
            .cast(1_000, FROST_SHOCK)
            .refresh_buff(2_000, ICEFURY)
            .cast(3_000, FROST_SHOCK)
            .cast(4_000, FROST_SHOCK)
            .cast(5_000, FROST_SHOCK)
            .cast(6_000, FROST_SHOCK)
            .remove_buff(7_000, ICEFURY);
        let report = analyze(builder);

        assert_eq!(report.metric("windows"), Some(&MetricValue::Count(2)));
        assert_eq!(report.metric("fail"), Some(&MetricValue::Count(1)));
        assert_eq!(report.metric("perfect"), Some(&MetricValue::Count(1)));
    }
}
