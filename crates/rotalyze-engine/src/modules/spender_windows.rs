use rotalyze_types::{AbilityId, AnnotationSeverity, CapabilityId, EventMeta};
use serde::{Deserialize, Serialize};

use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Dependency, Module, ModuleContext, Shared};
use crate::modules::buffs::ActiveBuffs;
use crate::modules::enemies::Enemies;
use crate::performance::{PerformanceThresholds, QualitativePerformance, classify};
use crate::report::ReportBuilder;
use crate::suggestions::{SuggestionThresholds, ThresholdSpec};
use crate::window::{SubEvent, WindowTracker};

/// Buff or debuff that is only judged when its capability is unlocked.
#[derive(Debug, Clone, Copy, Deserialize)]
struct GatedAura {
    ability: AbilityId,
    #[serde(default)]
    requires: Option<CapabilityId>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct SpenderOverride {
    capability: CapabilityId,
    spender: AbilityId,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Breakdown {
    #[serde(default = "default_perfect_share")]
    perfect: PerformanceThresholds,
    #[serde(default = "default_missing_buff")]
    missing_buff: PerformanceThresholds,
    #[serde(default = "default_missing_debuff")]
    missing_debuff: PerformanceThresholds,
    #[serde(default = "default_wrong_follow_up")]
    wrong_follow_up: PerformanceThresholds,
}

impl Default for Breakdown {
    fn default() -> Self {
        Self {
            perfect: default_perfect_share(),
            missing_buff: default_missing_buff(),
            missing_debuff: default_missing_debuff(),
            wrong_follow_up: default_wrong_follow_up(),
        }
    }
}

fn default_perfect_share() -> PerformanceThresholds {
    PerformanceThresholds::new(0.9, 0.6, 0.5)
}

fn default_missing_buff() -> PerformanceThresholds {
    PerformanceThresholds::new(0.0, 0.4, 0.5)
}

fn default_missing_debuff() -> PerformanceThresholds {
    PerformanceThresholds::new(0.0, 0.2, 0.3)
}

fn default_wrong_follow_up() -> PerformanceThresholds {
    PerformanceThresholds::new(0.0, 0.05, 0.1)
}

#[derive(Debug, Default, Deserialize)]
struct SpenderSettings {
    requires: CapabilityId,
    spender: AbilityId,
    #[serde(default)]
    spender_override: Option<SpenderOverride>,
    /// Buff granted by the spender that empowers the follow-up
    empowerment: AbilityId,
    /// Casts that can consume the empowerment
    follow_ups: Vec<AbilityId>,
    /// The subset of `follow_ups` that makes good use of it
    good_follow_ups: Vec<AbilityId>,
    /// Buff that should be up when the spender is cast
    #[serde(default)]
    opening_buff: Option<GatedAura>,
    /// Debuff that should be on the follow-up's target
    #[serde(default)]
    target_debuff: Option<GatedAura>,
    #[serde(default)]
    breakdown: Breakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpenderState {
    pub opening_buff: bool,
    pub target_debuff: bool,
    pub follow_up: Option<AbilityId>,
}

/// Spender casts and the empowered cast that follows each of them.
pub struct SpenderWindows {
    buffs: Shared<ActiveBuffs>,
    enemies: Shared<Enemies>,
    settings: SpenderSettings,
    spender: AbilityId,
    judge_buff: bool,
    judge_debuff: bool,
    buffer: u64,
    tracker: WindowTracker<SpenderState>,
}

impl Module for SpenderWindows {
    const NAME: &'static str = "spender_windows";

    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::on::<ActiveBuffs>(), Dependency::on::<Enemies>()]
    }

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let settings: Option<SpenderSettings> = ctx.settings()?;
        let mut module = Self {
            buffs: ctx.dependency::<ActiveBuffs>()?,
            enemies: ctx.dependency::<Enemies>()?,
            settings: SpenderSettings::default(),
            spender: AbilityId::default(),
            judge_buff: false,
            judge_debuff: false,
            buffer: ctx.policy().buff_buffer_ms,
            tracker: WindowTracker::new(ctx.diagnostics()),
        };

        let Some(settings) = settings else {
            ctx.disable("no spender configured");
            return Ok(module);
        };
        let run = ctx.run().clone();
        if !run.has_capability(settings.requires) {
            ctx.disable(format!("{} not unlocked", settings.requires));
            return Ok(module);
        }

        let judged = |aura: Option<GatedAura>| {
            aura.is_some_and(|a| a.requires.is_none_or(|c| run.has_capability(c)))
        };
        module.judge_buff = judged(settings.opening_buff);
        module.judge_debuff = judged(settings.target_debuff);
        module.spender = match settings.spender_override {
            Some(o) if run.has_capability(o.capability) => o.spender,
            _ => settings.spender,
        };

        ctx.subscribe(
            EventFilter::cast()
                .by(ActorRole::SelectedPlayer)
                .ability(module.spender),
            Self::on_spender,
        );
        ctx.subscribe(
            EventFilter::cast()
                .by(ActorRole::SelectedPlayer)
                .abilities(settings.follow_ups.iter().copied()),
            Self::on_follow_up,
        );
        ctx.subscribe(EventFilter::fight_end(), Self::on_fight_end);

        module.settings = settings;
        Ok(module)
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let windows = self.tracker.windows();
        let total = windows.len();
        report
            .count("windows", total)
            .count("discarded", self.tracker.discarded());
        if total == 0 {
            return;
        }

        let share = |count: usize| count as f64 / total as f64;
        let breakdown = &self.settings.breakdown;
        let perfect = share(
            self.tracker
                .count_where(|w| w.performance == Some(QualitativePerformance::Perfect)),
        );
        let wrong = share(self.tracker.count_where(|w| {
            w.state
                .follow_up
                .is_some_and(|a| !self.settings.good_follow_ups.contains(&a))
        }));

        report
            .ratio("perfect_share", perfect)
            .performance("perfect_performance", classify(perfect, &breakdown.perfect))
            .ratio("wrong_follow_up_share", wrong)
            .performance(
                "wrong_follow_up_performance",
                classify(wrong, &breakdown.wrong_follow_up),
            );
        if self.judge_buff {
            let missing = share(self.tracker.count_where(|w| !w.state.opening_buff));
            report.ratio("missing_buff_share", missing).performance(
                "missing_buff_performance",
                classify(missing, &breakdown.missing_buff),
            );
        }
        if self.judge_debuff {
            let missing = share(self.tracker.count_where(|w| !w.state.target_debuff));
            report.ratio("missing_debuff_share", missing).performance(
                "missing_debuff_performance",
                classify(missing, &breakdown.missing_debuff),
            );
        }

        let t = &breakdown.perfect;
        report.suggest(
            &ThresholdSpec::less_than(perfect, SuggestionThresholds::new(t.perfect, t.good, t.ok)),
            format!(
                "Follow every {} with an empowered cast while your other buffs are up.",
                self.spender
            ),
        );
    }
}

impl SpenderWindows {
    fn on_spender(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let opening_buff = self.settings.opening_buff.is_some_and(|aura| {
            self.buffs
                .borrow()
                .has_buff(aura.ability, ctx.timestamp(), self.buffer)
        });
        let state = SpenderState {
            opening_buff,
            target_debuff: false,
            follow_up: None,
        };
        if self.tracker.open(ctx.timestamp(), state) {
            self.tracker.push(SubEvent::from_event(ctx.index, ctx.event));
        } else {
            tracing::debug!(
                module = Self::NAME,
                timestamp = ctx.timestamp(),
                "two spenders in a row"
            );
        }
        Ok(())
    }

    fn on_follow_up(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if !self.tracker.is_open() {
            return Ok(());
        }
        let at = ctx.timestamp();
        if !self
            .buffs
            .borrow()
            .has_buff(self.settings.empowerment, at, self.buffer)
        {
            return Ok(());
        }

        let target_debuff = match (self.settings.target_debuff, ctx.event.target_id) {
            (Some(aura), Some(target)) => self.enemies.borrow().has_debuff(target, aura.ability, at),
            _ => false,
        };
        self.tracker.push(SubEvent::from_event(ctx.index, ctx.event));
        if let Some(window) = self.tracker.current_mut() {
            window.state.target_debuff = target_debuff;
            window.state.follow_up = ctx.event.ability;
        }

        let Some(window) = self.tracker.close(at) else {
            return Ok(());
        };
        let wrong = window
            .state
            .follow_up
            .is_some_and(|a| !self.settings.good_follow_ups.contains(&a));
        let perfect = (window.state.opening_buff || !self.judge_buff)
            && (window.state.target_debuff || !self.judge_debuff)
            && !wrong;
        window.performance = Some(if perfect {
            QualitativePerformance::Perfect
        } else {
            QualitativePerformance::Ok
        });
        if wrong {
            ctx.annotate_current(EventMeta::inefficient(
                AnnotationSeverity::Minor,
                "This cast wasted the spender's empowerment.",
            ));
        }
        Ok(())
    }

    fn on_fight_end(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.tracker.finish(ctx.timestamp());
        Ok(())
    }

    pub fn spender(&self) -> AbilityId {
        self.spender
    }
}
