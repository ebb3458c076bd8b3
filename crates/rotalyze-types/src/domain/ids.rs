use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since session start.
pub type Timestamp = u64;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            pub const fn new(raw: $inner) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }
    };
}

opaque_id!(
    /// Spell / ability identifier. Only equality and ordering carry meaning.
    AbilityId(u32),
    "ability"
);

opaque_id!(
    /// Actor (player, pet, enemy) identifier.
    ActorId(u64),
    "actor"
);

opaque_id!(
    /// Resource kind (mana, combo points, ...).
    ResourceType(u32),
    "resource"
);

opaque_id!(
    /// Unlocked capability such as a talent; gates module activation and capacities.
    CapabilityId(u32),
    "capability"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent_in_json() {
        let id = AbilityId::new(188196);
        assert_eq!(serde_json::to_string(&id).unwrap(), "188196");

        let parsed: ActorId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, ActorId(42));
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(AbilityId(7).to_string(), "ability:7");
        assert_eq!(ResourceType(11).to_string(), "resource:11");
    }
}
