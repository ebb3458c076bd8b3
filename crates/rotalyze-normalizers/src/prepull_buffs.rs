use rotalyze_types::{AbilityId, ActorId, Event, EventPayload, RunContext};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::insert::{Placement, insert_sorted};
use crate::traits::EventNormalizer;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepullBuffSpec {
    /// Buffs known to be active on the selected player when recording started
    #[serde(default)]
    pub active_at_start: Vec<AbilityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AuraSide {
    Buff,
    Debuff,
}

/// Synthesizes the missing apply for auras that were already up when the
/// recording began.
///
/// The first event seen for an aura (per ability and target) must be an apply;
/// when it is a refresh, a stack change or a removal instead, an apply is
/// fabricated at the fight start (or at that first event, if it is earlier).
pub struct PrepullBuffNormalizer {
    spec: PrepullBuffSpec,
}

impl PrepullBuffNormalizer {
    pub fn new(spec: PrepullBuffSpec) -> Self {
        Self { spec }
    }
}

fn classify(payload: &EventPayload) -> Option<(AuraSide, bool)> {
    match payload {
        EventPayload::ApplyBuff => Some((AuraSide::Buff, true)),
        EventPayload::RefreshBuff
        | EventPayload::RemoveBuff
        | EventPayload::ApplyBuffStack(_)
        | EventPayload::RemoveBuffStack(_) => Some((AuraSide::Buff, false)),
        EventPayload::ApplyDebuff => Some((AuraSide::Debuff, true)),
        EventPayload::RefreshDebuff | EventPayload::RemoveDebuff => {
            Some((AuraSide::Debuff, false))
        }
        _ => None,
    }
}

impl EventNormalizer for PrepullBuffNormalizer {
    fn name(&self) -> &'static str {
        "prepull_buffs"
    }

    fn normalize(&self, mut events: Vec<Event>, ctx: &RunContext) -> Vec<Event> {
        let mut seen: HashSet<(AuraSide, AbilityId, Option<ActorId>)> = HashSet::new();
        let mut fabricated = Vec::new();

        for event in &events {
            let (Some((side, is_apply)), Some(ability)) = (classify(&event.payload), event.ability)
            else {
                continue;
            };
            if !seen.insert((side, ability, event.target_id)) || is_apply {
                continue;
            }

            let payload = match side {
                AuraSide::Buff => EventPayload::ApplyBuff,
                AuraSide::Debuff => EventPayload::ApplyDebuff,
            };
            let mut apply = Event::new(event.timestamp.min(ctx.fight_start), payload)
                .with_ability(ability)
                .fabricate(true);
            apply.source_id = event.source_id;
            apply.source_is_friendly = event.source_is_friendly;
            apply.target_id = event.target_id;
            apply.target_is_friendly = event.target_is_friendly;
            fabricated.push(apply);
        }

        let player = Some(ctx.selected_player);
        for &ability in &self.spec.active_at_start {
            if seen.contains(&(AuraSide::Buff, ability, player)) {
                continue;
            }
            fabricated.push(
                Event::new(ctx.fight_start, EventPayload::ApplyBuff)
                    .with_source(ctx.selected_player, true)
                    .with_target(ctx.selected_player, true)
                    .with_ability(ability)
                    .fabricate(true),
            );
        }

        if !fabricated.is_empty() {
            tracing::debug!(count = fabricated.len(), "fabricated prepull auras");
        }
        for apply in fabricated {
            insert_sorted(&mut events, apply, Placement::BeforeTies);
        }
        events
    }
}
