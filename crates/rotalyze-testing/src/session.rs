//! Fluent builder for analysis sessions.

use rotalyze_types::{
    AbilityId, ActorId, BeginCastPayload, CapabilityId, CastPayload, DamagePayload,
    EndChannelPayload, Event, EventPayload, ResourceChangePayload, ResourceType, RunContext,
    StackPayload, Timestamp,
};

/// A run context plus the events recorded for it.
#[derive(Debug, Clone)]
pub struct Session {
    pub context: RunContext,
    pub events: Vec<Event>,
}

/// Declarative session builder.
///
/// Events are stably sorted by timestamp on `build()`, so events pushed with the
/// same timestamp keep their push order.
///
/// # Example
/// ```
/// use rotalyze_testing::SessionBuilder;
/// use rotalyze_types::{AbilityId, ActorId};
///
/// let session = SessionBuilder::new(ActorId(1))
///     .fight(0, 30_000)
///     .cast(1_000, AbilityId(10))
///     .apply_buff(1_000, AbilityId(11))
///     .remove_buff(9_000, AbilityId(11))
///     .build();
/// assert_eq!(session.events.len(), 3);
/// ```
pub struct SessionBuilder {
    context: RunContext,
    events: Vec<Event>,
    enemy: ActorId,
}

impl SessionBuilder {
    pub fn new(player: ActorId) -> Self {
        Self {
            context: RunContext::new(player, 0, 60_000),
            events: Vec::new(),
            enemy: ActorId(9000),
        }
    }

    pub fn fight(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.context.fight_start = start;
        self.context.fight_end = end;
        self
    }

    pub fn capability(mut self, capability: CapabilityId) -> Self {
        self.context.capabilities.insert(capability);
        self
    }

    /// Default hostile target for casts and debuffs
    pub fn enemy(mut self, enemy: ActorId) -> Self {
        self.enemy = enemy;
        self
    }

    pub fn player(&self) -> ActorId {
        self.context.selected_player
    }

    pub fn push(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    fn by_player(&self, ts: Timestamp, payload: EventPayload, ability: AbilityId) -> Event {
        Event::new(ts, payload)
            .with_source(self.player(), true)
            .with_ability(ability)
    }

    fn player_event(self, ts: Timestamp, payload: EventPayload, ability: AbilityId) -> Self {
        let event = self
            .by_player(ts, payload, ability)
            .with_target(self.enemy, false);
        self.push(event)
    }

    fn self_aura(self, ts: Timestamp, payload: EventPayload, ability: AbilityId) -> Self {
        let event = self
            .by_player(ts, payload, ability)
            .with_target(self.player(), true);
        self.push(event)
    }

    pub fn cast(self, ts: Timestamp, ability: AbilityId) -> Self {
        self.player_event(ts, EventPayload::Cast(CastPayload::default()), ability)
    }

    pub fn cast_with_gcd(self, ts: Timestamp, ability: AbilityId, gcd: u64) -> Self {
        self.player_event(
            ts,
            EventPayload::Cast(CastPayload {
                global_cooldown: Some(gcd),
            }),
            ability,
        )
    }

    pub fn begin_cast(self, ts: Timestamp, ability: AbilityId, cast_time: u64) -> Self {
        self.player_event(
            ts,
            EventPayload::BeginCast(BeginCastPayload { cast_time }),
            ability,
        )
    }

    /// Cast performed by another actor (pet, ally)
    pub fn cast_by(self, ts: Timestamp, source: ActorId, ability: AbilityId) -> Self {
        let event = Event::new(ts, EventPayload::Cast(CastPayload::default()))
            .with_source(source, true)
            .with_target(self.enemy, false)
            .with_ability(ability);
        self.push(event)
    }

    pub fn damage(self, ts: Timestamp, ability: AbilityId, target: ActorId, amount: u64) -> Self {
        let event = self
            .by_player(
                ts,
                EventPayload::Damage(DamagePayload {
                    amount,
                    ..Default::default()
                }),
                ability,
            )
            .with_target(target, false);
        self.push(event)
    }

    pub fn apply_buff(self, ts: Timestamp, ability: AbilityId) -> Self {
        self.self_aura(ts, EventPayload::ApplyBuff, ability)
    }

    pub fn refresh_buff(self, ts: Timestamp, ability: AbilityId) -> Self {
        self.self_aura(ts, EventPayload::RefreshBuff, ability)
    }

    pub fn remove_buff(self, ts: Timestamp, ability: AbilityId) -> Self {
        self.self_aura(ts, EventPayload::RemoveBuff, ability)
    }

    pub fn apply_buff_stack(self, ts: Timestamp, ability: AbilityId, stacks: u32) -> Self {
        self.self_aura(
            ts,
            EventPayload::ApplyBuffStack(StackPayload { stacks }),
            ability,
        )
    }

    pub fn apply_debuff(self, ts: Timestamp, ability: AbilityId, target: ActorId) -> Self {
        let event = self
            .by_player(ts, EventPayload::ApplyDebuff, ability)
            .with_target(target, false);
        self.push(event)
    }

    pub fn refresh_debuff(self, ts: Timestamp, ability: AbilityId, target: ActorId) -> Self {
        let event = self
            .by_player(ts, EventPayload::RefreshDebuff, ability)
            .with_target(target, false);
        self.push(event)
    }

    pub fn remove_debuff(self, ts: Timestamp, ability: AbilityId, target: ActorId) -> Self {
        let event = self
            .by_player(ts, EventPayload::RemoveDebuff, ability)
            .with_target(target, false);
        self.push(event)
    }

    /// Resource change on the player, attributed to `ability`
    pub fn resource(
        self,
        ts: Timestamp,
        resource: ResourceType,
        change: i64,
        ability: AbilityId,
    ) -> Self {
        self.self_aura(
            ts,
            EventPayload::ResourceChange(ResourceChangePayload {
                resource,
                change,
                waste: None,
            }),
            ability,
        )
    }

    pub fn begin_channel(self, ts: Timestamp, ability: AbilityId) -> Self {
        self.player_event(ts, EventPayload::BeginChannel, ability)
    }

    pub fn end_channel(self, ts: Timestamp, ability: AbilityId, duration: u64) -> Self {
        self.player_event(
            ts,
            EventPayload::EndChannel(EndChannelPayload { duration }),
            ability,
        )
    }

    pub fn fight_end(self, ts: Timestamp) -> Self {
        self.push(Event::new(ts, EventPayload::FightEnd))
    }

    pub fn build(mut self) -> Session {
        self.events.sort_by_key(|e| e.timestamp);
        Session {
            context: self.context,
            events: self.events,
        }
    }
}
