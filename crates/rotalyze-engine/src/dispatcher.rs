//! Ordered delivery of events to module handlers.

use rotalyze_types::{
    AbilityId, ActorId, Annotations, Event, EventKind, EventMeta, EventPayload, RunContext,
    Timestamp, first_out_of_order,
};
use std::collections::{BTreeSet, HashMap};

use crate::error::{EngineError, Result};

/// Which actors an event's source or target must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    SelectedPlayer,
    AnyFriendly,
    AnyHostile,
}

impl ActorRole {
    fn matches(&self, actor: Option<ActorId>, friendly: bool, run: &RunContext) -> bool {
        match self {
            ActorRole::SelectedPlayer => actor == Some(run.selected_player),
            ActorRole::AnyFriendly => friendly,
            ActorRole::AnyHostile => !friendly,
        }
    }
}

/// Event kind, actor and ability constraints of a subscription.
///
/// ```
/// use rotalyze_engine::{ActorRole, EventFilter};
/// use rotalyze_types::AbilityId;
///
/// let filter = EventFilter::cast()
///     .by(ActorRole::SelectedPlayer)
///     .abilities([AbilityId(51505), AbilityId(188196)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    kinds: Vec<EventKind>,
    by: Option<ActorRole>,
    to: Option<ActorRole>,
    abilities: Option<BTreeSet<AbilityId>>,
}

impl EventFilter {
    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            by: None,
            to: None,
            abilities: None,
        }
    }

    pub fn kind(kind: EventKind) -> Self {
        Self::kinds([kind])
    }

    pub fn cast() -> Self {
        Self::kind(EventKind::Cast)
    }

    pub fn damage() -> Self {
        Self::kind(EventKind::Damage)
    }

    pub fn resource_change() -> Self {
        Self::kind(EventKind::ResourceChange)
    }

    pub fn fight_end() -> Self {
        Self::kind(EventKind::FightEnd)
    }

    pub fn by(mut self, role: ActorRole) -> Self {
        self.by = Some(role);
        self
    }

    pub fn to(mut self, role: ActorRole) -> Self {
        self.to = Some(role);
        self
    }

    pub fn ability(self, ability: AbilityId) -> Self {
        self.abilities([ability])
    }

    /// Restrict to the given abilities; repeated calls widen the set.
    pub fn abilities(mut self, abilities: impl IntoIterator<Item = AbilityId>) -> Self {
        self.abilities
            .get_or_insert_with(BTreeSet::new)
            .extend(abilities);
        self
    }

    pub fn matches(&self, event: &Event, run: &RunContext) -> bool {
        self.kinds.contains(&event.kind())
            && self.abilities.as_ref().is_none_or(|set| {
                event.ability.is_some_and(|ability| set.contains(&ability))
            })
            && self
                .by
                .is_none_or(|role| role.matches(event.source_id, event.source_is_friendly, run))
            && self
                .to
                .is_none_or(|role| role.matches(event.target_id, event.target_is_friendly, run))
    }
}

pub type BoxedHandler = Box<dyn FnMut(&mut HandlerContext<'_>) -> anyhow::Result<()>>;

pub struct Subscription {
    module: &'static str,
    filter: EventFilter,
    handler: BoxedHandler,
}

impl Subscription {
    pub fn new(module: &'static str, filter: EventFilter, handler: BoxedHandler) -> Self {
        Self {
            module,
            filter,
            handler,
        }
    }

    pub fn module(&self) -> &'static str {
        self.module
    }
}

/// What a handler sees while processing one event.
pub struct HandlerContext<'a> {
    pub event: &'a Event,

    /// Position in the normalized sequence; the synthetic fight end uses `len()`
    pub index: usize,

    pub run: &'a RunContext,

    annotations: &'a mut Annotations,
}

impl<'a> HandlerContext<'a> {
    pub fn annotate(&mut self, index: usize, meta: EventMeta) -> bool {
        self.annotations.annotate(index, meta)
    }

    pub fn annotate_current(&mut self, meta: EventMeta) -> bool {
        self.annotations.annotate(self.index, meta)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.event.timestamp
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub events: usize,
    pub invocations: usize,
    pub synthetic_fight_end: bool,
}

pub struct Dispatcher {
    subscriptions: Vec<Subscription>,
    by_kind: HashMap<EventKind, Vec<usize>>,
    by_ability: HashMap<(EventKind, AbilityId), Vec<usize>>,
}

impl Dispatcher {
    pub fn new(subscriptions: Vec<Subscription>) -> Self {
        let mut by_kind: HashMap<EventKind, Vec<usize>> = HashMap::new();
        let mut by_ability: HashMap<(EventKind, AbilityId), Vec<usize>> = HashMap::new();

        for (id, subscription) in subscriptions.iter().enumerate() {
            for &kind in &subscription.filter.kinds {
                match &subscription.filter.abilities {
                    Some(abilities) => {
                        for &ability in abilities {
                            by_ability.entry((kind, ability)).or_default().push(id);
                        }
                    }
                    None => by_kind.entry(kind).or_default().push(id),
                }
            }
        }

        Self {
            subscriptions,
            by_kind,
            by_ability,
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Subscription ids interested in `event`, in registration order.
    fn candidates(&self, event: &Event) -> Vec<usize> {
        let kind = event.kind();
        let general = self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let specific = event
            .ability
            .and_then(|ability| self.by_ability.get(&(kind, ability)))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut merged = Vec::with_capacity(general.len() + specific.len());
        let (mut i, mut j) = (0, 0);
        while i < general.len() && j < specific.len() {
            if general[i] < specific[j] {
                merged.push(general[i]);
                i += 1;
            } else {
                merged.push(specific[j]);
                j += 1;
            }
        }
        merged.extend_from_slice(&general[i..]);
        merged.extend_from_slice(&specific[j..]);
        merged
    }

    fn deliver(
        &mut self,
        event: &Event,
        index: usize,
        run: &RunContext,
        annotations: &mut Annotations,
        stats: &mut DispatchStats,
    ) -> Result<()> {
        for id in self.candidates(event) {
            let subscription = &mut self.subscriptions[id];
            if !subscription.filter.matches(event, run) {
                continue;
            }

            let mut ctx = HandlerContext {
                event,
                index,
                run,
                annotations: &mut *annotations,
            };
            stats.invocations += 1;
            (subscription.handler)(&mut ctx).map_err(|source| EngineError::Handler {
                module: subscription.module,
                event_index: index,
                timestamp: event.timestamp,
                kind: event.kind(),
                source,
            })?;
        }
        Ok(())
    }

    /// Deliver every event, then a synthetic fight end if the sequence had none.
    pub fn run(
        &mut self,
        events: &[Event],
        run: &RunContext,
        annotations: &mut Annotations,
    ) -> Result<DispatchStats> {
        if let Some(index) = first_out_of_order(events) {
            return Err(EngineError::OutOfOrder { index });
        }

        let mut stats = DispatchStats::default();
        let mut saw_fight_end = false;
        for (index, event) in events.iter().enumerate() {
            saw_fight_end |= matches!(event.payload, EventPayload::FightEnd);
            stats.events += 1;
            self.deliver(event, index, run, annotations, &mut stats)?;
        }

        if !saw_fight_end {
            let last = events.last().map(|e| e.timestamp).unwrap_or(0);
            let fight_end = Event::new(run.fight_end.max(last), EventPayload::FightEnd);
            stats.synthetic_fight_end = true;
            self.deliver(&fight_end, events.len(), run, annotations, &mut stats)?;
        }

        tracing::debug!(
            events = stats.events,
            invocations = stats.invocations,
            synthetic_fight_end = stats.synthetic_fight_end,
            "dispatch complete"
        );
        Ok(stats)
    }
}
