use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::{ActorId, CapabilityId, Timestamp};

/// Immutable facts about one analysis run, handed to every normalizer and module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    #[serde(default)]
    pub fight_start: Timestamp,

    pub fight_end: Timestamp,

    /// Actor whose performance is analysed
    pub selected_player: ActorId,

    /// Unlocked capabilities (talents) for the selected player
    #[serde(default)]
    pub capabilities: BTreeSet<CapabilityId>,
}

impl RunContext {
    pub fn new(selected_player: ActorId, fight_start: Timestamp, fight_end: Timestamp) -> Self {
        Self {
            fight_start,
            fight_end,
            selected_player,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_capability(mut self, capability: CapabilityId) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn has_capability(&self, capability: CapabilityId) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Encounter length in ms, never zero so that rates stay finite.
    pub fn fight_duration(&self) -> u64 {
        self.fight_end.saturating_sub(self.fight_start).max(1)
    }

    /// Milliseconds since the encounter started, clamped at zero for prepull events.
    pub fn relative(&self, timestamp: Timestamp) -> u64 {
        timestamp.saturating_sub(self.fight_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fight_duration_never_zero() {
        let ctx = RunContext::new(ActorId(1), 500, 500);
        assert_eq!(ctx.fight_duration(), 1);

        let ctx = RunContext::new(ActorId(1), 1000, 61000);
        assert_eq!(ctx.fight_duration(), 60000);
        assert_eq!(ctx.relative(400), 0);
        assert_eq!(ctx.relative(2500), 1500);
    }

    #[test]
    fn test_capabilities() {
        let ctx = RunContext::new(ActorId(1), 0, 10).with_capability(CapabilityId(7));
        assert!(ctx.has_capability(CapabilityId(7)));
        assert!(!ctx.has_capability(CapabilityId(8)));
    }
}
