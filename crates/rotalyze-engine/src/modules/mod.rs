//! Built-in analysis modules.
//!
//! Every module reads its settings from `[modules.<name>]` and disables itself
//! when it is not configured or its capability is missing.

pub mod active_time;
pub mod buffs;
pub mod cooldown_windows;
pub mod debuff_coverage;
pub mod dot_snapshot;
pub mod enemies;
pub mod resource_usage;
pub mod spender_windows;
pub mod stack_windows;

pub use active_time::ActiveTime;
pub use buffs::ActiveBuffs;
pub use cooldown_windows::CooldownWindows;
pub use debuff_coverage::DebuffCoverage;
pub use dot_snapshot::DotSnapshot;
pub use enemies::Enemies;
pub use resource_usage::Resources;
pub use spender_windows::SpenderWindows;
pub use stack_windows::StackWindows;

use crate::registry::Registry;

/// Make every built-in module available without requesting it.
pub fn register_all(registry: &mut Registry) {
    registry
        .register::<ActiveBuffs>()
        .register::<Enemies>()
        .register::<Resources>()
        .register::<ActiveTime>()
        .register::<DotSnapshot>()
        .register::<CooldownWindows>()
        .register::<SpenderWindows>()
        .register::<StackWindows>()
        .register::<DebuffCoverage>();
}

/// Request every built-in module, in report order.
pub fn request_all(registry: &mut Registry) {
    registry
        .request::<ActiveTime>()
        .request::<Resources>()
        .request::<ActiveBuffs>()
        .request::<Enemies>()
        .request::<DotSnapshot>()
        .request::<CooldownWindows>()
        .request::<SpenderWindows>()
        .request::<StackWindows>()
        .request::<DebuffCoverage>();
}
