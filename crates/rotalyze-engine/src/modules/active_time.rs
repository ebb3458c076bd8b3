use rotalyze_types::{AbilityId, EventKind, EventPayload};
use serde::Deserialize;
use std::collections::HashMap;

use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Module, ModuleContext};
use crate::report::{MetricValue, ReportBuilder};
use crate::suggestions::{SuggestionThresholds, ThresholdSpec};

#[derive(Debug, Deserialize)]
struct ActiveTimeSettings {
    /// Thresholds on the active time ratio (smaller is worse)
    #[serde(default = "default_active")]
    active: SuggestionThresholds,
}

impl Default for ActiveTimeSettings {
    fn default() -> Self {
        Self {
            active: default_active(),
        }
    }
}

fn default_active() -> SuggestionThresholds {
    SuggestionThresholds::new(0.95, 0.85, 0.75)
}

/// Time spent casting or on the global cooldown.
///
/// Each cast adds the longer of its GCD and its cast time. A channel adds its
/// duration when it ends, but never less than the GCD it triggered. Prepull
/// casts are ignored.
pub struct ActiveTime {
    active_ms: u64,
    last_gcd: u64,
    cast_times: HashMap<AbilityId, u64>,
    channel: Option<(AbilityId, Option<u64>)>,
    settings: ActiveTimeSettings,
}

impl Module for ActiveTime {
    const NAME: &'static str = "active_time";

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let settings = ctx.settings()?.unwrap_or_default();
        let by_player = |kind| EventFilter::kind(kind).by(ActorRole::SelectedPlayer);

        ctx.subscribe(by_player(EventKind::BeginCast), Self::on_begin_cast);
        ctx.subscribe(by_player(EventKind::BeginChannel), Self::on_begin_channel);
        ctx.subscribe(by_player(EventKind::Cast), Self::on_cast);
        ctx.subscribe(by_player(EventKind::EndChannel), Self::on_end_channel);

        Ok(Self {
            active_ms: 0,
            last_gcd: 0,
            cast_times: HashMap::new(),
            channel: None,
            settings,
        })
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let duration = report.run().fight_duration();
        let active = self.active_ms.min(duration);
        let ratio = active as f64 / duration as f64;
        let spec = ThresholdSpec::less_than(ratio, self.settings.active);

        report
            .metric("active_time", MetricValue::DurationMs(active))
            .metric("downtime", MetricValue::DurationMs(duration - active))
            .ratio("active_ratio", ratio)
            .ratio("downtime_ratio", 1.0 - ratio)
            .performance("performance", spec.performance())
            .suggest(
                &spec,
                "Your downtime can be improved. Try to Always Be Casting (ABC), reduce the \
                 delay between casts and cast something while moving.",
            );
    }
}

impl ActiveTime {
    fn on_begin_cast(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let (EventPayload::BeginCast(begin), Some(ability)) =
            (&ctx.event.payload, ctx.event.ability)
        {
            self.cast_times.insert(ability, begin.cast_time);
        }
        Ok(())
    }

    fn on_begin_channel(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        if let Some(ability) = ctx.event.ability {
            self.channel = Some((ability, None));
        }
        Ok(())
    }

    fn on_cast(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let EventPayload::Cast(cast) = &ctx.event.payload else {
            return Ok(());
        };
        let cast_time = ctx
            .event
            .ability
            .and_then(|ability| self.cast_times.remove(&ability))
            .unwrap_or(0);
        if let Some(gcd) = cast.global_cooldown {
            self.last_gcd = gcd;
        }
        if ctx.event.prepull {
            return Ok(());
        }

        // the channel's time is added when it ends
        if let Some((channeled, gcd)) = &mut self.channel
            && ctx.event.ability == Some(*channeled)
        {
            *gcd = cast.global_cooldown;
            return Ok(());
        }

        self.active_ms += cast.global_cooldown.unwrap_or(0).max(cast_time);
        Ok(())
    }

    fn on_end_channel(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let EventPayload::EndChannel(end) = &ctx.event.payload else {
            return Ok(());
        };
        let gcd = match self.channel.take() {
            Some((ability, Some(_))) if ctx.event.ability == Some(ability) => self.last_gcd,
            _ => 0,
        };
        self.active_ms += end.duration.max(gcd);
        Ok(())
    }

    pub fn active_ms(&self) -> u64 {
        self.active_ms
    }
}
