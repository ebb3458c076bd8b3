use rotalyze_types::{AbilityId, Event, EventPayload, RunContext, Timestamp};
use serde::{Deserialize, Serialize};

use crate::insert::{Placement, insert_sorted};
use crate::traits::EventNormalizer;

/// A timed ability (typically a summon) whose follow-up abilities can only be
/// cast while it is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecastSpec {
    /// The cast that starts the timed effect
    pub ability: AbilityId,

    /// Abilities that are only usable while the effect is up (may be cast by a pet)
    pub children: Vec<AbilityId>,

    /// How long one cast of `ability` lasts, ms
    pub duration: u64,

    /// How far into the fight to look for the last child cast of the precast instance, ms
    #[serde(default = "default_search_window")]
    pub search_window: u64,
}

fn default_search_window() -> u64 {
    40_000
}

/// Infers a cast that happened before recording began.
///
/// If a child ability shows up before any cast of the parent ability, the parent
/// must have been cast before the log started. Its timestamp is estimated by
/// taking the last child cast early in the fight and subtracting the parent's
/// duration. This is a best-effort guess: the fabricated cast is flagged
/// `fabricated` and `prepull`, and never placed after the fight start.
pub struct PrecastNormalizer {
    spec: PrecastSpec,
}

impl PrecastNormalizer {
    pub fn new(spec: PrecastSpec) -> Self {
        Self { spec }
    }

    fn is_cast_of(&self, event: &Event, abilities: &[AbilityId]) -> bool {
        matches!(event.payload, EventPayload::Cast(_)) && event.is_any_ability(abilities)
    }

    fn last_child_cast(&self, events: &[Event], ctx: &RunContext) -> Option<Timestamp> {
        let horizon = ctx.fight_start + self.spec.search_window;
        events
            .iter()
            .filter(|e| e.timestamp <= horizon)
            .rev()
            .find(|e| self.is_cast_of(e, &self.spec.children))
            .map(|e| e.timestamp)
    }
}

impl EventNormalizer for PrecastNormalizer {
    fn name(&self) -> &'static str {
        "precast"
    }

    fn normalize(&self, mut events: Vec<Event>, ctx: &RunContext) -> Vec<Event> {
        let parent = [self.spec.ability];
        let first = events
            .iter()
            .find(|e| self.is_cast_of(e, &parent) || self.is_cast_of(e, &self.spec.children));

        let Some(first_child) = first.filter(|e| !e.is_any_ability(&parent)) else {
            // parent cast observed first (or never needed): nothing to infer
            return events;
        };

        let estimated = self
            .last_child_cast(&events, ctx)
            .map(|last| last.saturating_sub(self.spec.duration))
            .unwrap_or(ctx.fight_start);
        let timestamp = estimated.min(ctx.fight_start).min(first_child.timestamp);

        let mut fabricated = Event::new(timestamp, EventPayload::Cast(Default::default()))
            .with_source(ctx.selected_player, true)
            .with_ability(self.spec.ability)
            .fabricate(true);
        if let Some(target) = first_child.target_id {
            fabricated = fabricated.with_target(target, first_child.target_is_friendly);
        }

        tracing::debug!(
            ability = %self.spec.ability,
            timestamp,
            "fabricated precast"
        );
        insert_sorted(&mut events, fabricated, Placement::BeforeTies);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotalyze_types::{ActorId, CastPayload, is_time_ordered};

    const SUMMON: AbilityId = AbilityId(192249);
    const GUST: AbilityId = AbilityId(157331);
    const PET: ActorId = ActorId(50);

    fn spec() -> PrecastSpec {
        PrecastSpec {
            ability: SUMMON,
            children: vec![GUST],
            duration: 30_000,
            search_window: 40_000,
        }
    }

    fn cast(ts: u64, ability: AbilityId, source: ActorId) -> Event {
        Event::new(ts, EventPayload::Cast(CastPayload::default()))
            .with_source(source, true)
            .with_target(ActorId(900), false)
            .with_ability(ability)
    }

    fn ctx() -> RunContext {
        RunContext::new(ActorId(1), 10_000, 300_000)
    }

    #[test]
    fn test_fabricates_cast_from_last_child() {
        let events = vec![
            cast(11_000, GUST, PET),
            cast(20_000, GUST, PET),
            cast(35_000, GUST, PET),
            cast(60_000, GUST, PET),
        ];

        let out = PrecastNormalizer::new(spec()).normalize(events, &ctx());

        assert_eq!(out.len(), 5);
        let first = &out[0];
        assert!(first.fabricated && first.prepull);
        assert!(first.is_ability(SUMMON));
        assert!(first.is_by(ActorId(1)));
        // 35s - 30s = 5s, before fight start, kept as is
        assert_eq!(first.timestamp, 5_000);
        assert_eq!(first.target_id, Some(ActorId(900)));
        assert!(is_time_ordered(&out));
    }

    #[test]
    fn test_estimate_is_clamped_to_fight_start() {
        let events = vec![cast(12_000, GUST, PET), cast(49_000, GUST, PET)];
        let out = PrecastNormalizer::new(spec()).normalize(events, &ctx());

        // 49s - 30s = 19s would be after the pull, so the cast is clamped
        assert_eq!(out[0].timestamp, 10_000);
        assert!(is_time_ordered(&out));
    }

    #[test]
    fn test_observed_parent_cast_leaves_sequence_untouched() {
        let events = vec![
            cast(11_000, SUMMON, ActorId(1)),
            cast(12_000, GUST, PET),
        ];
        let out = PrecastNormalizer::new(spec()).normalize(events.clone(), &ctx());
        assert_eq!(out, events);
    }

    #[test]
    fn test_no_children_no_change() {
        let events = vec![cast(11_000, AbilityId(1), ActorId(1))];
        let out = PrecastNormalizer::new(spec()).normalize(events.clone(), &ctx());
        assert_eq!(out, events);
    }
}
