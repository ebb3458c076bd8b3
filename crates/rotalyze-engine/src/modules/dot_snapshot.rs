use rotalyze_types::{
    AbilityId, ActorId, AnnotationSeverity, CapabilityId, EventKind, EventMeta, Timestamp,
};
use serde::Deserialize;

use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Dependency, Module, ModuleContext, Shared};
use crate::modules::buffs::ActiveBuffs;
use crate::report::{MetricValue, ReportBuilder};
use crate::suggestions::{SuggestionThresholds, ThresholdSpec, ThresholdStyle};
use crate::timed_effect::{RefreshKind, RefreshRules, Snapshot, TimedEffectTracker, Transition};

#[derive(Debug, Clone, Deserialize)]
struct PowerBuff {
    buff: AbilityId,
    power: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct DurationBonus {
    capability: CapabilityId,
    multiplier: f64,
}

#[derive(Debug, Deserialize)]
struct DotSettings {
    /// Cast that applies the damage over time
    cast: AbilityId,
    /// The debuff itself
    debuff: AbilityId,
    /// Base duration of a fresh application, ms
    duration: u64,
    #[serde(default)]
    duration_bonus: Option<DurationBonus>,
    /// Buffs that strengthen the effect while they are up at application
    #[serde(default)]
    empowering: Vec<PowerBuff>,
    /// Buff whose empowerment must not be cut short by refreshing without it
    #[serde(default)]
    premium: Option<PowerBuff>,
    #[serde(default = "default_lost_per_minute")]
    lost_per_minute: SuggestionThresholds,
    #[serde(default = "default_downgrades")]
    downgrades: SuggestionThresholds,
}

fn default_lost_per_minute() -> SuggestionThresholds {
    SuggestionThresholds::new(0.5, 1.5, 3.0)
}

fn default_downgrades() -> SuggestionThresholds {
    SuggestionThresholds::new(0.0, 0.15, 0.3)
}

/// Attributes captured from the player's buffs when the effect is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DotPower {
    pub power: f64,
    pub premium: bool,
}

impl Snapshot for DotPower {
    fn power(&self) -> f64 {
        self.power
    }

    fn is_premium(&self) -> bool {
        self.premium
    }
}

/// Refresh quality of one damage-over-time effect.
pub struct DotSnapshot {
    buffs: Shared<ActiveBuffs>,
    settings: DotSettings,
    tracker: TimedEffectTracker<DotPower>,
    rules: RefreshRules,
    last_cast: Option<usize>,
    casts: usize,
    refreshes: usize,
    downgrades: usize,
    lost_count: usize,
    lost_ms: u64,
}

impl Module for DotSnapshot {
    const NAME: &'static str = "dot_snapshot";

    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::on::<ActiveBuffs>()]
    }

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let buffs = ctx.dependency::<ActiveBuffs>()?;
        let settings: Option<DotSettings> = ctx.settings()?;
        let Some(settings) = settings else {
            ctx.disable("no damage over time configured");
            return Ok(Self::idle(buffs, ctx));
        };

        let duration = match &settings.duration_bonus {
            Some(bonus) if ctx.run().has_capability(bonus.capability) => {
                (settings.duration as f64 * bonus.multiplier).round() as u64
            }
            _ => settings.duration,
        };

        ctx.subscribe(
            EventFilter::cast()
                .by(ActorRole::SelectedPlayer)
                .ability(settings.cast),
            Self::on_cast,
        );
        let debuff = |kind| {
            EventFilter::kind(kind)
                .by(ActorRole::SelectedPlayer)
                .ability(settings.debuff)
        };
        ctx.subscribe(debuff(EventKind::ApplyDebuff), Self::on_apply);
        ctx.subscribe(debuff(EventKind::RefreshDebuff), Self::on_refresh);
        ctx.subscribe(debuff(EventKind::RemoveDebuff), Self::on_remove);
        ctx.subscribe(EventFilter::fight_end(), Self::on_fight_end);

        let tracker = TimedEffectTracker::new(ctx.policy().pandemic_fraction, ctx.diagnostics())
            .with_duration(settings.debuff, duration);
        let mut module = Self::idle(buffs, ctx);
        module.tracker = tracker;
        module.settings = settings;
        Ok(module)
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let downgrade_ratio = if self.casts == 0 {
            0.0
        } else {
            self.downgrades as f64 / self.casts as f64
        };
        let lost_per_minute = self.lost_ms as f64 / 1000.0 / report.fight_minutes();

        report
            .count("casts", self.casts)
            .count("refreshes", self.refreshes)
            .count("downgrades", self.downgrades)
            .ratio("downgrade_ratio", downgrade_ratio)
            .count("empowerment_lost_count", self.lost_count)
            .metric("empowerment_lost", MetricValue::DurationMs(self.lost_ms))
            .metric("empowerment_lost_per_minute", MetricValue::Decimal(lost_per_minute))
            .suggest(
                &ThresholdSpec::greater_than(lost_per_minute, self.settings.lost_per_minute)
                    .style(ThresholdStyle::Decimal),
                format!(
                    "Avoid refreshing an empowered {} unless the replacement is empowered too. \
                     You ended {} empowered applications more than a second early.",
                    self.settings.debuff, self.lost_count
                ),
            )
            .suggest(
                &ThresholdSpec::greater_than(downgrade_ratio, self.settings.downgrades),
                format!(
                    "Only refresh {} before the pandemic window if your snapshot buffs are \
                     stronger than when it was applied.",
                    self.settings.debuff
                ),
            );
    }
}

impl DotSnapshot {
    fn idle(buffs: Shared<ActiveBuffs>, ctx: &ModuleContext<'_, Self>) -> Self {
        Self {
            buffs,
            settings: DotSettings {
                cast: AbilityId(0),
                debuff: AbilityId(0),
                duration: 0,
                duration_bonus: None,
                empowering: Vec::new(),
                premium: None,
                lost_per_minute: default_lost_per_minute(),
                downgrades: default_downgrades(),
            },
            tracker: TimedEffectTracker::new(ctx.policy().pandemic_fraction, ctx.diagnostics()),
            rules: RefreshRules::new(ctx.policy().refresh_forgiveness_ms),
            last_cast: None,
            casts: 0,
            refreshes: 0,
            downgrades: 0,
            lost_count: 0,
            lost_ms: 0,
        }
    }

    fn power_at(&self, at: Timestamp) -> DotPower {
        let buffs = self.buffs.borrow();
        let mut power: f64 = self
            .settings
            .empowering
            .iter()
            .filter(|b| buffs.has_buff_at(b.buff, at))
            .map(|b| b.power)
            .product();
        let premium = self
            .settings
            .premium
            .as_ref()
            .filter(|p| buffs.has_buff_at(p.buff, at));
        if let Some(premium) = premium {
            power *= premium.power;
        }
        DotPower {
            power,
            premium: premium.is_some(),
        }
    }

    fn key(ctx: &HandlerContext<'_>) -> Option<(AbilityId, ActorId)> {
        ctx.event.ability.zip(ctx.event.target_id)
    }

    fn on_cast(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.casts += 1;
        self.last_cast = Some(ctx.index);
        Ok(())
    }

    fn on_apply(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let Some(key) = Self::key(ctx) else {
            return Ok(());
        };
        let power = self.power_at(ctx.timestamp());
        let transition = self.tracker.apply(key, ctx.timestamp(), power);
        self.evaluate(key, transition, ctx);
        Ok(())
    }

    fn on_refresh(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let Some(key) = Self::key(ctx) else {
            return Ok(());
        };
        let power = self.power_at(ctx.timestamp());
        let transition = self.tracker.refresh(key, ctx.timestamp(), power);
        self.evaluate(key, transition, ctx);
        Ok(())
    }

    fn on_remove(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let Some(key) = Self::key(ctx) {
            self.tracker.remove(key, ctx.timestamp());
        }
        Ok(())
    }

    fn on_fight_end(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.tracker.close_all(ctx.timestamp());
        Ok(())
    }

    /// Judge a refresh and annotate the cast that caused it.
    fn evaluate(
        &mut self,
        key: (AbilityId, ActorId),
        transition: Transition,
        ctx: &mut HandlerContext<'_>,
    ) {
        let cast_index = self.last_cast.take().unwrap_or(ctx.index);
        let Transition::Refreshed(refreshed) = transition else {
            return;
        };
        self.refreshes += 1;

        let (Some(previous), Some(current)) = (
            self.tracker.interval(key, refreshed.previous),
            self.tracker.interval(key, refreshed.current),
        ) else {
            return;
        };

        match self.rules.classify(previous, current, ctx.timestamp()) {
            RefreshKind::EmpowermentLoss { lost, significant } => {
                self.lost_ms += lost;
                if significant {
                    self.lost_count += 1;
                    ctx.annotate(
                        cast_index,
                        EventMeta::inefficient(
                            AnnotationSeverity::Major,
                            format!(
                                "You lost {:.1} seconds of an empowered application by refreshing early.",
                                lost as f64 / 1000.0
                            ),
                        ),
                    );
                }
            }
            RefreshKind::Downgrade => {
                self.downgrades += 1;
                ctx.annotate(
                    cast_index,
                    EventMeta::inefficient(
                        AnnotationSeverity::Minor,
                        "You refreshed with a weaker version before the pandemic window.",
                    ),
                );
            }
            RefreshKind::Clean => {}
        }
    }

    pub fn intervals(&self, target: ActorId) -> usize {
        self.tracker.intervals((self.settings.debuff, target)).len()
    }

    pub fn downgrades(&self) -> usize {
        self.downgrades
    }

    pub fn empowerment_lost_ms(&self) -> u64 {
        self.lost_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::config::AnalysisConfig;
    use crate::registry::Registry;
    use rotalyze_testing::SessionBuilder;
    use rotalyze_types::CastVerdict;
    use serde_json::json;

    const RAKE: AbilityId = AbilityId(1822);
    const RAKE_BLEED: AbilityId = AbilityId(155722);
    const TIGERS_FURY: AbilityId = AbilityId(5217);
    const PROWL: AbilityId = AbilityId(5215);
    const ENEMY: ActorId = ActorId(9000);

    fn config() -> AnalysisConfig {
        AnalysisConfig::default().with_module(
            "dot_snapshot",
            json!({
                "cast": 1822,
                "debuff": 155722,
                "duration": 15000,
                "empowering": [{ "buff": 5217, "power": 1.15 }],
                "premium": { "buff": 5215, "power": 2.0 },
            }),
        )
    }

    fn run(builder: SessionBuilder) -> crate::analysis::AnalysisOutcome {
        let session = builder.build();
        let mut registry = Registry::new();
        crate::modules::register_all(&mut registry);
        registry.request::<DotSnapshot>();
        Analyzer::new(config())
            .with_registry(registry)
            .run(session.events, &session.context)
            .unwrap()
    }

    #[test]
    fn test_early_weaker_refresh_is_a_downgrade() {
        let outcome = run(SessionBuilder::new(ActorId(1))
            .apply_buff(0, TIGERS_FURY)
            .cast(0, RAKE)
            .apply_debuff(0, RAKE_BLEED, ENEMY)
            .remove_buff(5_000, TIGERS_FURY)
            .cast(9_000, RAKE)
            .refresh_debuff(9_000, RAKE_BLEED, ENEMY));

        let module = outcome.modules.get::<DotSnapshot>().unwrap();
        assert_eq!(module.borrow().downgrades(), 1);
        assert_eq!(module.borrow().intervals(ENEMY), 2);

        let annotation = &outcome.report.annotations[0];
        assert_eq!(annotation.meta.verdict, CastVerdict::Inefficient);
        assert_eq!(annotation.meta.severity, AnnotationSeverity::Minor);
        assert_eq!(annotation.ability, Some(RAKE));
    }

    #[test]
    fn test_refresh_in_pandemic_window_is_clean() {
        let outcome = run(SessionBuilder::new(ActorId(1))
            .apply_buff(0, TIGERS_FURY)
            .cast(0, RAKE)
            .apply_debuff(0, RAKE_BLEED, ENEMY)
            .remove_buff(5_000, TIGERS_FURY)
            .cast(14_000, RAKE)
            .refresh_debuff(14_000, RAKE_BLEED, ENEMY)
            .remove_debuff(29_000, RAKE_BLEED, ENEMY));

        let module = outcome.modules.get::<DotSnapshot>().unwrap();
        assert_eq!(module.borrow().downgrades(), 0);
        assert_eq!(module.borrow().intervals(ENEMY), 2);
        assert!(outcome.report.annotations.is_empty());
    }

    #[test]
    fn test_premium_loss_is_summed_and_flagged() {
        let outcome = run(SessionBuilder::new(ActorId(1))
            .apply_buff(0, PROWL)
            .cast(0, RAKE)
            .apply_debuff(0, RAKE_BLEED, ENEMY)
            .remove_buff(0, PROWL)
            // 800ms lost: summed, not flagged
            .cast(14_200, RAKE)
            .refresh_debuff(14_200, RAKE_BLEED, ENEMY)
            .apply_buff(20_000, PROWL)
            .cast(20_000, RAKE)
            .refresh_debuff(20_000, RAKE_BLEED, ENEMY)
            .remove_buff(20_000, PROWL)
            // 11.8s lost: flagged
            .cast(27_700, RAKE)
            .refresh_debuff(27_700, RAKE_BLEED, ENEMY));

        let module = outcome.modules.get::<DotSnapshot>().unwrap();
        let module = module.borrow();
        // second interval: 14.2s + min(0.8 + 15, 19.5) = 30s, third: 20s + min(10 + 15, 19.5) = 39.5s
        assert_eq!(module.empowerment_lost_ms(), 800 + 11_800);

        let report = outcome.report.module("dot_snapshot").unwrap();
        assert_eq!(report.metric("empowerment_lost_count"), Some(&MetricValue::Count(1)));
        assert_eq!(outcome.report.annotations.len(), 1);
        assert_eq!(
            outcome.report.annotations[0].meta.severity,
            AnnotationSeverity::Major
        );
    }

    #[test]
    fn test_disabled_without_settings() {
        let session = SessionBuilder::new(ActorId(1)).build();
        let mut registry = Registry::new();
        crate::modules::register_all(&mut registry);
        registry.request::<DotSnapshot>();
        let outcome = Analyzer::new(AnalysisConfig::default())
            .with_registry(registry)
            .run(session.events, &session.context)
            .unwrap();

        assert!(!outcome.report.module("dot_snapshot").unwrap().active);
        // the dependency is still constructed and active
        assert!(outcome.report.module("buffs").unwrap().active);
    }
}
