use serde::{Deserialize, Serialize};

use super::payload::{EventKind, EventPayload};
use crate::domain::{AbilityId, ActorId, Timestamp};

// NOTE: Event model
//
// - Events are immutable once recorded. Downstream verdicts go into the
//   annotation table (see `meta.rs`), never into the event itself.
// - `timestamp` ties are legal; arrival order is the tiebreak everywhere.
// - `fabricated` events were inferred by a normalizer, not recorded.

/// Combat event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Milliseconds since session start
    pub timestamp: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<ActorId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ActorId>,

    #[serde(default)]
    pub source_is_friendly: bool,

    #[serde(default)]
    pub target_is_friendly: bool,

    /// Ability involved (spell cast, buff applied, resource source, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<AbilityId>,

    /// Inserted by a normalizer rather than recorded
    #[serde(default, skip_serializing_if = "is_false")]
    pub fabricated: bool,

    /// Happened before recording began
    #[serde(default, skip_serializing_if = "is_false")]
    pub prepull: bool,

    /// Event type and kind-specific fields (flattened enum)
    #[serde(flatten)]
    pub payload: EventPayload,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Event {
    pub fn new(timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            timestamp,
            source_id: None,
            target_id: None,
            source_is_friendly: false,
            target_is_friendly: false,
            ability: None,
            fabricated: false,
            prepull: false,
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn is_ability(&self, ability: AbilityId) -> bool {
        self.ability == Some(ability)
    }

    pub fn is_any_ability(&self, abilities: &[AbilityId]) -> bool {
        self.ability.is_some_and(|a| abilities.contains(&a))
    }

    pub fn is_by(&self, actor: ActorId) -> bool {
        self.source_id == Some(actor)
    }

    pub fn is_on(&self, actor: ActorId) -> bool {
        self.target_id == Some(actor)
    }

    pub fn with_source(mut self, actor: ActorId, friendly: bool) -> Self {
        self.source_id = Some(actor);
        self.source_is_friendly = friendly;
        self
    }

    pub fn with_target(mut self, actor: ActorId, friendly: bool) -> Self {
        self.target_id = Some(actor);
        self.target_is_friendly = friendly;
        self
    }

    pub fn with_ability(mut self, ability: AbilityId) -> Self {
        self.ability = Some(ability);
        self
    }

    /// Mark as inferred by a normalizer, optionally placed before recording began.
    pub fn fabricate(mut self, prepull: bool) -> Self {
        self.fabricated = true;
        self.prepull = prepull;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::payload::{CastPayload, DamagePayload};

    #[test]
    fn test_serialization() {
        let event = Event::new(1500, EventPayload::Cast(CastPayload::default()))
            .with_source(ActorId(1), true)
            .with_ability(AbilityId(51505));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"cast""#));
        assert!(!json.contains("fabricated"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_unit_variant_deserialization() {
        let json = r#"{"timestamp": 10, "type": "remove_buff", "ability": 191634, "target_id": 1}"#;
        let event: Event = serde_json::from_str(json).unwrap();

        assert_eq!(event.kind(), EventKind::RemoveBuff);
        assert!(event.is_ability(AbilityId(191634)));
        assert!(event.is_on(ActorId(1)));
        assert!(!event.fabricated);
    }

    #[test]
    fn test_damage_defaults() {
        let json = r#"{"timestamp": 3, "type": "damage", "amount": 900}"#;
        let event: Event = serde_json::from_str(json).unwrap();

        match event.payload {
            EventPayload::Damage(DamagePayload {
                amount, absorbed, ..
            }) => {
                assert_eq!(amount, 900);
                assert_eq!(absorbed, 0);
            }
            _ => panic!("Wrong payload type"),
        }
    }
}
