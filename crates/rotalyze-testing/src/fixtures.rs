//! Sample sessions and configuration files.
//!
//! The sample is a short single-target encounter: a damage over time effect
//! that is refreshed once, one cooldown window and a few resource changes.

use rotalyze_types::{AbilityId, ActorId, ResourceType};

use crate::session::{Session, SessionBuilder};

pub const PLAYER: ActorId = ActorId(1);
pub const ENEMY: ActorId = ActorId(9000);

pub const LAVA_BURST: AbilityId = AbilityId(51505);
pub const LIGHTNING_BOLT: AbilityId = AbilityId(188196);
pub const EARTH_SHOCK: AbilityId = AbilityId(8042);
pub const FLAME_SHOCK: AbilityId = AbilityId(188389);
pub const STORMKEEPER: AbilityId = AbilityId(191634);
pub const MAELSTROM: ResourceType = ResourceType(11);

/// Number of resource changes in [`sample_session`].
pub const SAMPLE_RESOURCE_CHANGES: usize = 4;

/// Configuration matching [`sample_session`], including the `[run]` table.
pub const SAMPLE_CONFIG: &str = r#"
[run]
fight_start = 0
fight_end = 20000
selected_player = 1

[[resources]]
resource = 11
name = "maelstrom"
base_capacity = 100

[modules.dot_snapshot]
cast = 188389
debuff = 188389
duration = 18000

[modules.cooldown_windows]
trigger = 191634
buff = 191634
rotation_starters = [188196, 51505, 8042]
"#;

/// Twenty seconds of casting with one cooldown window and one refresh.
pub fn sample_session() -> Session {
    SessionBuilder::new(PLAYER)
        .fight(0, 20_000)
        .enemy(ENEMY)
        .cast_with_gcd(0, FLAME_SHOCK, 1_500)
        .apply_debuff(0, FLAME_SHOCK, ENEMY)
        .cast_with_gcd(1_500, LAVA_BURST, 1_500)
        .resource(1_500, MAELSTROM, 10, LAVA_BURST)
        .cast_with_gcd(3_000, STORMKEEPER, 1_500)
        .apply_buff(3_000, STORMKEEPER)
        .cast_with_gcd(4_500, LIGHTNING_BOLT, 1_500)
        .resource(4_500, MAELSTROM, 8, LIGHTNING_BOLT)
        .cast_with_gcd(6_000, LIGHTNING_BOLT, 1_500)
        .resource(6_000, MAELSTROM, 8, LIGHTNING_BOLT)
        .cast_with_gcd(7_500, EARTH_SHOCK, 1_500)
        .resource(7_500, MAELSTROM, -20, EARTH_SHOCK)
        .remove_buff(8_000, STORMKEEPER)
        // early, but not weaker
        .cast_with_gcd(8_500, FLAME_SHOCK, 1_500)
        .refresh_debuff(8_500, FLAME_SHOCK, ENEMY)
        .remove_debuff(19_000, FLAME_SHOCK, ENEMY)
        .build()
}
