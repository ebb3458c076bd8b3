use rotalyze_types::{AbilityId, CapabilityId};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Dependency, Module, ModuleContext, Shared};
use crate::modules::enemies::Enemies;
use crate::report::ReportBuilder;

#[derive(Debug, Clone, Deserialize)]
struct ChainGroup {
    /// Cast that starts a new group of hits
    casts: Vec<AbilityId>,
    /// Damage abilities whose hits belong to the group
    members: Vec<AbilityId>,
    /// Member whose hit count decides whether the group is kept
    primary: AbilityId,
    /// Groups hitting more targets than this are ignored
    max_targets: usize,
}

#[derive(Debug, Default, Deserialize)]
struct CoverageSettings {
    debuff: AbilityId,
    abilities: Vec<AbilityId>,
    #[serde(default)]
    chains: Vec<ChainGroup>,
    #[serde(default)]
    requires: Option<CapabilityId>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub covered: u64,
    pub uncovered: u64,
}

impl Coverage {
    fn add(&mut self, covered: bool) {
        if covered {
            self.covered += 1;
        } else {
            self.uncovered += 1;
        }
    }

    pub fn ratio(&self) -> f64 {
        let total = self.covered + self.uncovered;
        if total == 0 {
            0.0
        } else {
            self.covered as f64 / total as f64
        }
    }
}

/// Share of damage instances that landed on a target carrying the debuff.
pub struct DebuffCoverage {
    enemies: Shared<Enemies>,
    settings: CoverageSettings,
    by_ability: BTreeMap<AbilityId, Coverage>,
    /// Hits of each chain group since its last cast
    pending: Vec<Vec<(AbilityId, bool)>>,
}

impl Module for DebuffCoverage {
    const NAME: &'static str = "debuff_coverage";

    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::on::<Enemies>()]
    }

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let settings: Option<CoverageSettings> = ctx.settings()?;
        let mut module = Self {
            enemies: ctx.dependency::<Enemies>()?,
            settings: CoverageSettings::default(),
            by_ability: BTreeMap::new(),
            pending: Vec::new(),
        };
        let Some(settings) = settings else {
            ctx.disable("no debuff configured");
            return Ok(module);
        };
        if let Some(capability) = settings.requires
            && !ctx.run().has_capability(capability)
        {
            ctx.disable(format!("{capability} not unlocked"));
            return Ok(module);
        }

        let damage: Vec<AbilityId> = settings
            .abilities
            .iter()
            .chain(settings.chains.iter().flat_map(|c| c.members.iter()))
            .copied()
            .collect();
        ctx.subscribe(
            EventFilter::damage()
                .by(ActorRole::SelectedPlayer)
                .abilities(damage),
            Self::on_damage,
        );
        ctx.subscribe(
            EventFilter::cast()
                .by(ActorRole::SelectedPlayer)
                .abilities(settings.chains.iter().flat_map(|c| c.casts.iter().copied())),
            Self::on_chain_cast,
        );
        ctx.subscribe(EventFilter::fight_end(), Self::on_fight_end);

        module.pending = vec![Vec::new(); settings.chains.len()];
        module.settings = settings;
        Ok(module)
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let mut total = Coverage::default();
        for (ability, coverage) in &self.by_ability {
            let id = ability.raw();
            report
                .count(&format!("{id}.covered"), coverage.covered as usize)
                .count(&format!("{id}.uncovered"), coverage.uncovered as usize)
                .ratio(&format!("{id}.coverage"), coverage.ratio());
            total.covered += coverage.covered;
            total.uncovered += coverage.uncovered;
        }
        report.ratio("coverage", total.ratio());
    }
}

impl DebuffCoverage {
    fn on_damage(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let (Some(ability), Some(target)) = (ctx.event.ability, ctx.event.target_id) else {
            return Ok(());
        };
        let covered = self
            .enemies
            .borrow()
            .has_debuff(target, self.settings.debuff, ctx.timestamp());

        let group = self
            .settings
            .chains
            .iter()
            .position(|c| c.members.contains(&ability));
        match group {
            Some(group) => self.pending[group].push((ability, covered)),
            None => self.by_ability.entry(ability).or_default().add(covered),
        }
        Ok(())
    }

    fn flush(&mut self, group: usize) {
        let hits = std::mem::take(&mut self.pending[group]);
        let chain = &self.settings.chains[group];
        let primary_hits = hits.iter().filter(|(a, _)| *a == chain.primary).count();
        if primary_hits > chain.max_targets {
            return;
        }
        for (ability, covered) in hits {
            self.by_ability.entry(ability).or_default().add(covered);
        }
    }

    fn on_chain_cast(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let Some(ability) = ctx.event.ability else {
            return Ok(());
        };
        let groups: Vec<usize> = (0..self.settings.chains.len())
            .filter(|&i| self.settings.chains[i].casts.contains(&ability))
            .collect();
        for group in groups {
            self.flush(group);
        }
        Ok(())
    }

    fn on_fight_end(&mut self, _ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        for group in 0..self.pending.len() {
            self.flush(group);
        }
        Ok(())
    }

    pub fn coverage(&self, ability: AbilityId) -> Coverage {
        self.by_ability.get(&ability).copied().unwrap_or_default()
    }
}
