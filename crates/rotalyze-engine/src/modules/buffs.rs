use rotalyze_types::{AbilityId, EventKind, EventPayload, Timestamp};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Module, ModuleContext};
use crate::report::ReportBuilder;
use crate::timed_effect::TimedEffectTracker;

#[derive(Debug, Default, Deserialize)]
struct BuffSettings {
    /// Buffs whose uptime is reported
    #[serde(default)]
    uptime: Vec<AbilityId>,
}

/// Buffs on the selected player.
pub struct ActiveBuffs {
    tracker: TimedEffectTracker<()>,
    stacks: BTreeMap<AbilityId, u32>,
    player: rotalyze_types::ActorId,
    fight: (Timestamp, Timestamp),
    buffer: u64,
    uptime: Vec<AbilityId>,
}

impl Module for ActiveBuffs {
    const NAME: &'static str = "buffs";

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let settings: BuffSettings = ctx.settings()?.unwrap_or_default();
        let on_player = |kind| EventFilter::kind(kind).to(ActorRole::SelectedPlayer);

        ctx.subscribe(on_player(EventKind::ApplyBuff), Self::on_apply);
        ctx.subscribe(on_player(EventKind::RefreshBuff), Self::on_refresh);
        ctx.subscribe(on_player(EventKind::RemoveBuff), Self::on_remove);
        ctx.subscribe(
            EventFilter::kinds([EventKind::ApplyBuffStack, EventKind::RemoveBuffStack])
                .to(ActorRole::SelectedPlayer),
            Self::on_stack,
        );
        ctx.subscribe(EventFilter::fight_end(), Self::on_fight_end);

        Ok(Self {
            tracker: TimedEffectTracker::new(ctx.policy().pandemic_fraction, ctx.diagnostics()),
            stacks: BTreeMap::new(),
            player: ctx.run().selected_player,
            fight: (ctx.run().fight_start, ctx.run().fight_end),
            buffer: ctx.policy().buff_buffer_ms,
            uptime: settings.uptime,
        })
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        report.count("tracked", self.tracker.keys().count());
        let duration = report.run().fight_duration() as f64;
        for &ability in &self.uptime {
            let uptime = self
                .tracker
                .uptime((ability, self.player), self.fight.0, self.fight.1);
            report.ratio(&format!("uptime.{}", ability.raw()), uptime as f64 / duration);
        }
    }
}

impl ActiveBuffs {
    fn on_apply(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let Some(ability) = ctx.event.ability {
            self.tracker.apply((ability, self.player), ctx.timestamp(), ());
        }
        Ok(())
    }

    fn on_refresh(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let Some(ability) = ctx.event.ability {
            self.tracker.refresh((ability, self.player), ctx.timestamp(), ());
        }
        Ok(())
    }

    fn on_remove(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let Some(ability) = ctx.event.ability {
            self.tracker.remove((ability, self.player), ctx.timestamp());
            self.stacks.remove(&ability);
        }
        Ok(())
    }

    fn on_stack(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let Some(ability) = ctx.event.ability else {
            return Ok(());
        };
        match &ctx.event.payload {
            EventPayload::ApplyBuffStack(stack) | EventPayload::RemoveBuffStack(stack) => {
                self.stacks.insert(ability, stack.stacks);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_fight_end(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.tracker.close_all(ctx.timestamp());
        Ok(())
    }

    /// Whether the buff was up at `at`, or fell off at most `buffer` ms before.
    pub fn has_buff(&self, ability: AbilityId, at: Timestamp, buffer: u64) -> bool {
        self.tracker.was_active((ability, self.player), at, buffer)
    }

    /// `has_buff` with the configured default buffer.
    pub fn has_buff_at(&self, ability: AbilityId, at: Timestamp) -> bool {
        self.has_buff(ability, at, self.buffer)
    }

    pub fn is_active(&self, ability: AbilityId) -> bool {
        self.tracker.is_active((ability, self.player))
    }

    /// Buffs among `candidates` that count as present at `at`.
    pub fn present(&self, candidates: &[AbilityId], at: Timestamp) -> Vec<AbilityId> {
        candidates
            .iter()
            .copied()
            .filter(|&ability| self.has_buff_at(ability, at))
            .collect()
    }

    pub fn stacks(&self, ability: AbilityId) -> u32 {
        match self.stacks.get(&ability) {
            Some(&stacks) => stacks,
            None if self.is_active(ability) => 1,
            None => 0,
        }
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
    use rotalyze_types::ActorId;

    const SOP: AbilityId = AbilityId(327164);

    #[test]
    fn test_has_buff_with_buffer() {
        let session = SessionBuilder::new(ActorId(1))
            .apply_buff(1_000, SOP)
            .remove_buff(4_000, SOP)
            .build();
        let mut registry = Registry::new();
        registry.request::<ActiveBuffs>();

        let outcome = Analyzer::new(AnalysisConfig::default())
            .with_registry(registry)
            .run(session.events, &session.context)
            .unwrap();
        let buffs = outcome.modules.get::<ActiveBuffs>().unwrap();
        let buffs = buffs.borrow();

        assert!(buffs.has_buff(SOP, 2_000, 0));
        assert!(!buffs.has_buff(SOP, 4_050, 0));
        assert!(buffs.has_buff(SOP, 4_050, 100));
        assert!(!buffs.has_buff(SOP, 500, 100));
        assert!(!buffs.is_active(SOP));
    }
}
