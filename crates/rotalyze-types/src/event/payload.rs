use serde::{Deserialize, Serialize};

use crate::domain::ResourceType;

/// Event payload variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// Ability use completed (instant cast or end of a cast time)
    Cast(CastPayload),

    /// Start of a cast time
    BeginCast(BeginCastPayload),

    Damage(DamagePayload),

    Heal(HealPayload),

    ApplyBuff,
    RefreshBuff,
    RemoveBuff,

    ApplyDebuff,
    RefreshDebuff,
    RemoveDebuff,

    ApplyBuffStack(StackPayload),
    RemoveBuffStack(StackPayload),

    /// Generation or expenditure of a class resource
    ResourceChange(ResourceChangePayload),

    BeginChannel,
    EndChannel(EndChannelPayload),

    /// End of the analysed encounter
    FightEnd,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastPayload {
    /// Global cooldown triggered by this cast (ms), when the ability is on the GCD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_cooldown: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeginCastPayload {
    /// Cast time in ms
    pub cast_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamagePayload {
    pub amount: u64,
    #[serde(default)]
    pub absorbed: u64,
    #[serde(default)]
    pub overkill: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealPayload {
    pub amount: u64,
    #[serde(default)]
    pub overheal: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackPayload {
    pub stacks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChangePayload {
    pub resource: ResourceType,

    /// Signed change; positive is generation, negative is expenditure
    pub change: i64,

    /// Waste as reported by the recording, if any. The engine recomputes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndChannelPayload {
    /// Channel duration in ms
    pub duration: u64,
}

/// Fieldless discriminant of [`EventPayload`], used to index subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Cast,
    BeginCast,
    Damage,
    Heal,
    ApplyBuff,
    RefreshBuff,
    RemoveBuff,
    ApplyDebuff,
    RefreshDebuff,
    RemoveDebuff,
    ApplyBuffStack,
    RemoveBuffStack,
    ResourceChange,
    BeginChannel,
    EndChannel,
    FightEnd,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Cast => "cast",
            EventKind::BeginCast => "begin_cast",
            EventKind::Damage => "damage",
            EventKind::Heal => "heal",
            EventKind::ApplyBuff => "apply_buff",
            EventKind::RefreshBuff => "refresh_buff",
            EventKind::RemoveBuff => "remove_buff",
            EventKind::ApplyDebuff => "apply_debuff",
            EventKind::RefreshDebuff => "refresh_debuff",
            EventKind::RemoveDebuff => "remove_debuff",
            EventKind::ApplyBuffStack => "apply_buff_stack",
            EventKind::RemoveBuffStack => "remove_buff_stack",
            EventKind::ResourceChange => "resource_change",
            EventKind::BeginChannel => "begin_channel",
            EventKind::EndChannel => "end_channel",
            EventKind::FightEnd => "fight_end",
        }
    }

    /// Apply / refresh / remove of a buff or debuff.
    pub fn is_aura_change(&self) -> bool {
        matches!(
            self,
            EventKind::ApplyBuff
                | EventKind::RefreshBuff
                | EventKind::RemoveBuff
                | EventKind::ApplyDebuff
                | EventKind::RefreshDebuff
                | EventKind::RemoveDebuff
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Cast(_) => EventKind::Cast,
            EventPayload::BeginCast(_) => EventKind::BeginCast,
            EventPayload::Damage(_) => EventKind::Damage,
            EventPayload::Heal(_) => EventKind::Heal,
            EventPayload::ApplyBuff => EventKind::ApplyBuff,
            EventPayload::RefreshBuff => EventKind::RefreshBuff,
            EventPayload::RemoveBuff => EventKind::RemoveBuff,
            EventPayload::ApplyDebuff => EventKind::ApplyDebuff,
            EventPayload::RefreshDebuff => EventKind::RefreshDebuff,
            EventPayload::RemoveDebuff => EventKind::RemoveDebuff,
            EventPayload::ApplyBuffStack(_) => EventKind::ApplyBuffStack,
            EventPayload::RemoveBuffStack(_) => EventKind::RemoveBuffStack,
            EventPayload::ResourceChange(_) => EventKind::ResourceChange,
            EventPayload::BeginChannel => EventKind::BeginChannel,
            EventPayload::EndChannel(_) => EventKind::EndChannel,
            EventPayload::FightEnd => EventKind::FightEnd,
        }
    }
}
