use rotalyze_types::{EventPayload, ResourceType};
use std::collections::BTreeMap;

use crate::config::ResourceSpec;
use crate::dispatcher::{ActorRole, EventFilter, HandlerContext};
use crate::module::{Module, ModuleContext};
use crate::report::{MetricValue, ReportBuilder};
use crate::resources::ResourceTracker;
use crate::suggestions::{SuggestionThresholds, ThresholdSpec, ThresholdStyle};

const DEFAULT_WASTE_PER_MINUTE: SuggestionThresholds = SuggestionThresholds::new(5.0, 10.0, 15.0);

/// One tracker per configured resource of the selected player.
pub struct Resources {
    trackers: BTreeMap<ResourceType, ResourceTracker>,
    specs: Vec<ResourceSpec>,
}

impl Module for Resources {
    const NAME: &'static str = "resources";

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
        let specs = ctx.config().resources.clone();
        if specs.is_empty() {
            ctx.disable("no resources configured");
        }

        let mut trackers = BTreeMap::new();
        for spec in &specs {
            let capacity = spec.capacity(ctx.run());
            anyhow::ensure!(
                capacity > 0,
                "resource '{}' has no capacity ({capacity})",
                spec.name
            );
            trackers.insert(
                spec.resource,
                ResourceTracker::new(spec.resource, capacity, spec.initial, ctx.diagnostics()),
            );
        }

        ctx.subscribe(
            EventFilter::resource_change().to(ActorRole::SelectedPlayer),
            Self::on_change,
        );
        Ok(Self { trackers, specs })
    }

    fn report(&self, report: &mut ReportBuilder<'_>) {
        let minutes = report.fight_minutes();
        for spec in &self.specs {
            let Some(tracker) = self.trackers.get(&spec.resource) else {
                continue;
            };
            let name = &spec.name;
            let wasted_per_minute = tracker.wasted_total() as f64 / minutes;

            report
                .metric(&format!("{name}.generated"), MetricValue::Amount(tracker.generated_total()))
                .metric(&format!("{name}.spent"), MetricValue::Amount(tracker.spent_total()))
                .metric(&format!("{name}.wasted"), MetricValue::Amount(tracker.wasted_total()))
                .metric(&format!("{name}.final"), MetricValue::Amount(tracker.current()))
                .metric(
                    &format!("{name}.wasted_per_minute"),
                    MetricValue::Decimal(wasted_per_minute),
                )
                .suggest(
                    &ThresholdSpec::greater_than(
                        wasted_per_minute,
                        spec.waste_per_minute.unwrap_or(DEFAULT_WASTE_PER_MINUTE),
                    )
                    .style(ThresholdStyle::Decimal),
                    format!(
                        "You are wasting {name}: {} lost to capping. Spend it before it overflows.",
                        tracker.wasted_total()
                    ),
                )
                .attach(&format!("ledger.{name}"), tracker.ledger());
        }
    }
}

impl Resources {
    fn on_change(&mut self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let EventPayload::ResourceChange(change) = &ctx.event.payload else {
            return Ok(());
        };
        if let Some(tracker) = self.trackers.get_mut(&change.resource) {
            tracker.record(ctx.timestamp(), ctx.event.ability, change.change, change.waste);
        }
        Ok(())
    }

    pub fn tracker(&self, resource: ResourceType) -> Option<&ResourceTracker> {
        self.trackers.get(&resource)
    }

    /// Current amount, zero for an untracked resource.
    pub fn current(&self, resource: ResourceType) -> i64 {
        self.tracker(resource).map(ResourceTracker::current).unwrap_or(0)
    }

    pub fn capacity(&self, resource: ResourceType) -> Option<i64> {
        self.tracker(resource).map(ResourceTracker::capacity)
    }
}
