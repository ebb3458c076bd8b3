use rotalyze_types::{AbilityId, ActorId, EventKind, Timestamp};
use serde::Deserialize;

use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Module, ModuleContext};
use crate::report::ReportBuilder;
use crate::timed_effect::TimedEffectTracker;

#[derive(Debug, Deserialize)]
struct DebuffDuration {
    ability: AbilityId,
    duration: u64,
}

#[derive(Debug, Default, Deserialize)]
struct EnemySettings {
    /// Base durations, needed for remaining-time queries
    #[serde(default)]
    durations: Vec<DebuffDuration>,

    /// Debuffs whose coverage (time any target carries them) is reported
    #[serde(default)]
    uptime: Vec<AbilityId>,
}

/// Debuffs applied by the selected player, per target.
pub struct Enemies {
    tracker: TimedEffectTracker<()>,
    uptime: Vec<AbilityId>,
}

impl Module for Enemies {
    const NAME: &'static str = "enemies";

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let settings: EnemySettings = ctx.settings()?.unwrap_or_default();
        let by_player = |kind| EventFilter::kind(kind).by(ActorRole::SelectedPlayer);

        ctx.subscribe(by_player(EventKind::ApplyDebuff), Self::on_apply);
        ctx.subscribe(by_player(EventKind::RefreshDebuff), Self::on_refresh);
        ctx.subscribe(by_player(EventKind::RemoveDebuff), Self::on_remove);
        ctx.subscribe(EventFilter::fight_end(), Self::on_fight_end);

        let mut tracker = TimedEffectTracker::new(ctx.policy().pandemic_fraction, ctx.diagnostics());
        for entry in &settings.durations {
            tracker.set_duration(entry.ability, entry.duration);
        }
        Ok(Self {
            tracker,
            uptime: settings.uptime,
        })
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let (start, end) = (report.run().fight_start, report.run().fight_end);
        let duration = report.run().fight_duration() as f64;
        report.count("targets", self.targets().len());
        for &ability in &self.uptime {
            let covered = self.coverage(ability, start, end);
            report.ratio(&format!("uptime.{}", ability.raw()), covered as f64 / duration);
        }
    }
}

impl Enemies {
    fn key(ctx: &HandlerContext<'_>) -> Option<(AbilityId, ActorId)> {
        ctx.event.ability.zip(ctx.event.target_id)
    }

    fn on_apply(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let Some(key) = Self::key(ctx) {
            self.tracker.apply(key, ctx.timestamp(), ());
        }
        Ok(())
    }

    fn on_refresh(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let Some(key) = Self::key(ctx) {
            self.tracker.refresh(key, ctx.timestamp(), ());
        }
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

    pub fn has_debuff(&self, target: ActorId, ability: AbilityId, at: Timestamp) -> bool {
        self.tracker.was_active((ability, target), at, 0)
    }

    /// Longest time left on `ability` across all targets at `at`.
    pub fn longest_remaining(&self, ability: AbilityId, at: Timestamp) -> u64 {
        self.tracker
            .active_on(ability)
            .map(|target| self.tracker.remaining((ability, target), at))
            .max()
            .unwrap_or(0)
    }

    pub fn targets(&self) -> Vec<ActorId> {
        let mut targets: Vec<ActorId> = self.tracker.keys().map(|(_, target)| target).collect();
        targets.sort();
        targets.dedup();
        targets
    }

    /// Time within `[from, to)` during which at least one target carried `ability`.
    pub fn coverage(&self, ability: AbilityId, from: Timestamp, to: Timestamp) -> u64 {
        let mut spans: Vec<(Timestamp, Timestamp)> = self
            .tracker
            .keys()
            .filter(|(a, _)| *a == ability)
            .flat_map(|key| self.tracker.intervals(key).iter())
            .map(|i| (i.start.max(from), i.end.unwrap_or(to).min(to)))
            .filter(|(start, end)| start < end)
            .collect();
        spans.sort();

        let mut covered = 0;
        let mut cursor = from;
        for (start, end) in spans {
            let start = start.max(cursor);
            if end > start {
                covered += end - start;
                cursor = end;
            }
        }
        covered
    }

    pub fn tracker(&self) -> &TimedEffectTracker<()> {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::config::AnalysisConfig;
    use crate::registry::Registry;
    use rotalyze_testing::SessionBuilder;
    use serde_json::json;

    const FLAME_SHOCK: AbilityId = AbilityId(188389);

    #[test]
    fn test_longest_remaining_and_coverage() {
        let (a, b) = (ActorId(900), ActorId(901));
        let session = SessionBuilder::new(ActorId(1))
            .fight(0, 40_000)
            .apply_debuff(0, FLAME_SHOCK, a)
            .apply_debuff(6_000, FLAME_SHOCK, b)
            .remove_debuff(18_000, FLAME_SHOCK, a)
            .remove_debuff(24_000, FLAME_SHOCK, b)
            .build();
        let config = AnalysisConfig::default().with_module(
            "enemies",
            json!({ "durations": [{ "ability": 188389, "duration": 18000 }], "uptime": [188389] }),
        );
        let mut registry = Registry::new();
        registry.request::<Enemies>();

        let outcome = Analyzer::new(config)
            .with_registry(registry)
            .run(session.events, &session.context)
            .unwrap();
        let enemies = outcome.modules.get::<Enemies>().unwrap();
        let enemies = enemies.borrow();

        assert!(enemies.has_debuff(a, FLAME_SHOCK, 10_000));
        assert!(!enemies.has_debuff(a, FLAME_SHOCK, 20_000));
        assert_eq!(enemies.coverage(FLAME_SHOCK, 0, 40_000), 24_000);
        assert_eq!(enemies.targets(), vec![a, b]);

        let report = outcome.report.module("enemies").unwrap();
        assert_eq!(
            report.metric("uptime.188389").and_then(|m| m.as_f64()),
            Some(0.6)
        );
    }
}
