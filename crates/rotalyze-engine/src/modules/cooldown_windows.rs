use rotalyze_types::{
    AbilityId, AnnotationSeverity, CapabilityId, EventKind, EventMeta, EventPayload, ResourceType,
    Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Dependency, Module, ModuleContext, Shared};
use crate::modules::buffs::ActiveBuffs;
use crate::modules::enemies::Enemies;
use crate::modules::resource_usage::Resources;
use crate::performance::{QualitativePerformance, SubCheck, combine, lowest};
use crate::report::{MetricValue, ReportBuilder};
use crate::window::{OrderingRule, SubEvent, Window, WindowTracker, check_preceded_by};

#[derive(Debug, Default, Deserialize)]
struct CooldownSettings {
    /// Cast that opens a window
    trigger: AbilityId,
    /// Buff whose removal closes the window
    buff: AbilityId,
    #[serde(default)]
    requires: Option<CapabilityId>,
    #[serde(default)]
    resource: Option<ResourceCheck>,
    #[serde(default)]
    debuffs: Vec<DebuffCheck>,
    /// Casts that mark the start of the actual rotation inside the window
    #[serde(default)]
    rotation_starters: Vec<AbilityId>,
    #[serde(default)]
    rules: Vec<RuleSettings>,
}

#[derive(Debug, Deserialize)]
struct ResourceCheck {
    resource: ResourceType,
    /// Amount needed at the start of the window
    required: i64,
    /// Being within this much of capacity counts as risking overflow
    #[serde(default)]
    overcap_margin: i64,
    /// Buffs that lower the requirement when present at the start
    #[serde(default)]
    discounts: Vec<Discount>,
}

#[derive(Debug, Deserialize)]
struct Discount {
    buff: AbilityId,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct DebuffCheck {
    ability: AbilityId,
    /// Remaining duration above which the check is perfect
    perfect_above: u64,
    /// Casts before the rotation starts that reapply the debuff
    #[serde(default)]
    refreshed_by: Vec<AbilityId>,
    #[serde(default)]
    refreshed_remaining: u64,
}

#[derive(Debug, Deserialize)]
struct RuleSettings {
    #[serde(flatten)]
    rule: OrderingRule,
    /// Buffs that satisfy the first consumer when up at the start
    #[serde(default)]
    primed_by: Vec<AbilityId>,
}

/// Values captured when a window opens.
#[derive(Debug, Clone, Serialize)]
pub struct CooldownState {
    pub trigger_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceSnapshot>,
    pub debuff_remaining: Vec<(AbilityId, u64)>,
    pub buffs: Vec<AbilityId>,
    pub checks: Vec<SubCheck>,
    #[serde(skip)]
    rotation_started: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResourceSnapshot {
    pub amount: i64,
    pub capacity: i64,
}

/// Windows opened by a cooldown cast and closed when its buff falls off.
///
/// Each window is judged on the resource available when it opened, the time
/// left on the configured debuffs, and the order of casts inside it.
pub struct CooldownWindows {
    buffs: Shared<ActiveBuffs>,
    enemies: Shared<Enemies>,
    resources: Shared<Resources>,
    settings: CooldownSettings,
    tracker: WindowTracker<CooldownState>,
    diagnostics: Diagnostics,
    damage_while_buffed: u64,
}

impl Module for CooldownWindows {
    const NAME: &'static str = "cooldown_windows";

    fn dependencies() -> Vec<Dependency> {
        vec![
            Dependency::on::<ActiveBuffs>(),
            Dependency::on::<Enemies>(),
            Dependency::on::<Resources>(),
        ]
    }

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let settings: Option<CooldownSettings> = ctx.settings()?;
        let mut module = Self {
            buffs: ctx.dependency::<ActiveBuffs>()?,
            enemies: ctx.dependency::<Enemies>()?,
            resources: ctx.dependency::<Resources>()?,
            settings: CooldownSettings::default(),
            tracker: WindowTracker::new(ctx.diagnostics()),
            diagnostics: ctx.diagnostics(),
            damage_while_buffed: 0,
        };

        let Some(settings) = settings else {
            ctx.disable("no cooldown configured");
            return Ok(module);
        };
        if let Some(capability) = settings.requires
            && !ctx.run().has_capability(capability)
        {
            ctx.disable(format!("{capability} not unlocked"));
            return Ok(module);
        }

        ctx.subscribe(EventFilter::cast().by(ActorRole::SelectedPlayer), Self::on_cast);
        ctx.subscribe(
            EventFilter::kind(EventKind::RemoveBuff)
                .to(ActorRole::SelectedPlayer)
                .ability(settings.buff),
            Self::on_buff_removed,
        );
        ctx.subscribe(EventFilter::damage().by(ActorRole::SelectedPlayer), Self::on_damage);
        ctx.subscribe(EventFilter::fight_end(), Self::on_fight_end);

        module.settings = settings;
        Ok(module)
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let windows = self.tracker.windows();
        let perfect = self
            .tracker
            .count_where(|w| w.performance == Some(QualitativePerformance::Perfect));

        report
            .count("windows", windows.len())
            .count("perfect", perfect)
            .count("imperfect", windows.len() - perfect)
            .count("discarded", self.tracker.discarded())
            .metric(
                "damage_while_buffed",
                MetricValue::Amount(self.damage_while_buffed as i64),
            );
        if !windows.is_empty() {
            report.performance(
                "performance",
                lowest(windows.iter().filter_map(|w| w.performance)),
            );
        }
        report.attach("windows", windows);
    }
}

impl CooldownWindows {
    fn snapshot(&self, index: usize, at: Timestamp) -> CooldownState {
        let buffs = self.buffs.borrow();
        let resource = self.settings.resource.as_ref().map(|check| {
            let resources = self.resources.borrow();
            ResourceSnapshot {
                amount: resources.current(check.resource),
                capacity: resources.capacity(check.resource).unwrap_or(0),
            }
        });

        let enemies = self.enemies.borrow();
        let debuff_remaining = self
            .settings
            .debuffs
            .iter()
            .map(|check| (check.ability, enemies.longest_remaining(check.ability, at)))
            .collect();

        let mut watched: Vec<AbilityId> = self
            .settings
            .rules
            .iter()
            .flat_map(|r| r.primed_by.iter().copied())
            .chain(
                self.settings
                    .resource
                    .iter()
                    .flat_map(|check| check.discounts.iter().map(|d| d.buff)),
            )
            .collect();
        watched.sort();
        watched.dedup();

        CooldownState {
            trigger_index: index,
            resource,
            debuff_remaining,
            buffs: buffs.present(&watched, at),
            checks: Vec::new(),
            rotation_started: false,
        }
    }

    fn on_cast(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let Some(ability) = ctx.event.ability else {
            return Ok(());
        };

        if ability == self.settings.trigger {
            let state = self.snapshot(ctx.index, ctx.timestamp());
            if !self.tracker.open(ctx.timestamp(), state) {
                tracing::debug!(
                    module = Self::NAME,
                    timestamp = ctx.timestamp(),
                    "trigger cast while a window is open"
                );
            }
            return Ok(());
        }

        let Some(window) = self.tracker.current_mut() else {
            return Ok(());
        };
        let state = &mut window.state;
        if !state.rotation_started {
            if self.settings.rotation_starters.contains(&ability) {
                state.rotation_started = true;
            } else {
                // reapplied before the rotation started, it will last through the window
                for check in &self.settings.debuffs {
                    if check.refreshed_by.contains(&ability)
                        && let Some(entry) = state.debuff_remaining.iter_mut().find(|(a, _)| *a == check.ability)
                    {
                        entry.1 = check.refreshed_remaining;
                    }
                }
            }
        }
        self.tracker.push(SubEvent::from_event(ctx.index, ctx.event));
        Ok(())
    }

    fn on_buff_removed(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let Some(window) = self.tracker.close(ctx.timestamp()) else {
            return Ok(());
        };
        let violations = evaluate(&self.settings, window);
        self.diagnostics.debug(|| {
            format!(
                "window {}-{}: {:?}, {} casts, checks {:?}",
                window.start,
                window.end,
                window.performance,
                window.sub_events.len(),
                window.state.checks
            )
        });
        for (index, reason) in violations {
            ctx.annotate(
                index,
                EventMeta::inefficient(AnnotationSeverity::Moderate, reason),
            );
        }
        Ok(())
    }

    fn on_damage(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let EventPayload::Damage(damage) = &ctx.event.payload else {
            return Ok(());
        };
        if self.buffs.borrow().has_buff(self.settings.buff, ctx.timestamp(), 0) {
            self.damage_while_buffed += damage.amount + damage.absorbed;
        }
        Ok(())
    }

    fn on_fight_end(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.tracker.finish(ctx.timestamp());
        Ok(())
    }

    pub fn windows(&self) -> &[Window<CooldownState>] {
        self.tracker.windows()
    }
}

/// Judge a closed window, returning the events that broke an ordering rule.
fn evaluate(settings: &CooldownSettings, window: &mut Window<CooldownState>) -> Vec<(usize, String)> {
    let mut violations = Vec::new();
    let mut order = QualitativePerformance::Perfect;
    for entry in &settings.rules {
        let primed = entry
            .primed_by
            .iter()
            .any(|buff| window.state.buffs.contains(buff));
        let found = check_preceded_by(&window.sub_events, &entry.rule, primed);
        if !found.is_empty() {
            order = order.min(entry.rule.cap);
        }
        violations.extend(
            found
                .into_iter()
                .map(|position| (window.sub_events[position].index, entry.rule.reason.clone())),
        );
    }

    let mut checks = vec![SubCheck::new("order", order)];
    if let (Some(check), Some(snapshot)) = (&settings.resource, window.state.resource) {
        let discount: i64 = check
            .discounts
            .iter()
            .filter(|d| window.state.buffs.contains(&d.buff))
            .map(|d| d.amount)
            .sum();
        let performance = if snapshot.amount > snapshot.capacity - check.overcap_margin {
            QualitativePerformance::Good
        } else if snapshot.amount >= check.required - discount {
            QualitativePerformance::Perfect
        } else {
            QualitativePerformance::Fail
        };
        checks.push(SubCheck::new("resource", performance));
    }
    for (check, (ability, remaining)) in settings.debuffs.iter().zip(&window.state.debuff_remaining) {
        let performance = if *remaining > check.perfect_above {
            QualitativePerformance::Perfect
        } else {
            QualitativePerformance::Ok
        };
        checks.push(
            SubCheck::new(format!("debuff.{}", ability.raw()), performance)
                .floored(QualitativePerformance::Good),
        );
    }

    window.performance = Some(combine(&checks));
    window.state.checks = checks;
    violations
}
