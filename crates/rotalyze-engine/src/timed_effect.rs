//! Interval tracking for timed effects (buffs, debuffs, damage over time).
//!
//! Each `(ability, actor)` pair is either inactive or has one open interval.
//! A refresh closes the open interval and opens the next one, carrying over at
//! most a pandemic fraction of the base duration.

use rotalyze_types::{AbilityId, ActorId, Timestamp};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::diagnostics::{Diagnostics, NoteKind};

pub type EffectKey = (AbilityId, ActorId);

/// Source-side attributes captured when an interval starts.
pub trait Snapshot: Clone {
    /// Relative strength; higher is better
    fn power(&self) -> f64 {
        1.0
    }

    /// Carries an attribute that is lost if the effect is refreshed without it
    fn is_premium(&self) -> bool {
        false
    }
}

impl Snapshot for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalEnd {
    Refresh,
    Removal,
    SessionEnd,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interval<A> {
    pub start: Timestamp,
    pub end: Option<Timestamp>,
    pub attributes: A,

    /// Unset when the effect's base duration is unknown
    pub expected_expiry: Option<Timestamp>,
    pub pandemic_start: Option<Timestamp>,

    /// Position of the interval this one replaced, in the same key's list
    pub previous: Option<usize>,
    pub ended_by: Option<IntervalEnd>,
}

impl<A> Interval<A> {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Half-open `[start, end)`; an open interval covers everything after `start`.
    pub fn covers(&self, at: Timestamp) -> bool {
        self.start <= at && self.end.is_none_or(|end| at < end)
    }

    pub fn duration(&self, until: Timestamp) -> u64 {
        self.end.unwrap_or(until).saturating_sub(self.start)
    }
}

/// Outcome of a refresh, pointing into the key's interval list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refreshed {
    pub previous: usize,
    pub current: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied(usize),
    Refreshed(Refreshed),
    Removed(usize),
    /// Removal of an effect that was not active
    Ignored,
}

struct EffectState<A> {
    intervals: Vec<Interval<A>>,
    active: Option<usize>,
}

impl<A> Default for EffectState<A> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
            active: None,
        }
    }
}

pub struct TimedEffectTracker<A> {
    effects: BTreeMap<EffectKey, EffectState<A>>,
    durations: HashMap<AbilityId, u64>,
    pandemic_fraction: f64,
    diagnostics: Diagnostics,
}

impl<A: Snapshot> TimedEffectTracker<A> {
    pub fn new(pandemic_fraction: f64, diagnostics: Diagnostics) -> Self {
        Self {
            effects: BTreeMap::new(),
            durations: HashMap::new(),
            pandemic_fraction,
            diagnostics,
        }
    }

    /// Base duration of one application, ms.
    pub fn with_duration(mut self, ability: AbilityId, duration: u64) -> Self {
        self.durations.insert(ability, duration);
        self
    }

    pub fn set_duration(&mut self, ability: AbilityId, duration: u64) {
        self.durations.insert(ability, duration);
    }

    fn pandemic_window(&self, duration: u64) -> u64 {
        (duration as f64 * self.pandemic_fraction).round() as u64
    }

    fn open(
        &mut self,
        key: EffectKey,
        at: Timestamp,
        attributes: A,
        carried: u64,
        previous: Option<usize>,
    ) -> usize {
        let duration = self.durations.get(&key.0).copied();
        let window = duration.map(|d| self.pandemic_window(d));
        let expected_expiry = duration.zip(window).map(|(d, w)| at + (carried + d).min(d + w));

        let state = self.effects.entry(key).or_default();
        state.intervals.push(Interval {
            start: at,
            end: None,
            attributes,
            expected_expiry,
            pandemic_start: expected_expiry.zip(window).map(|(e, w)| e.saturating_sub(w)),
            previous,
            ended_by: None,
        });
        let index = state.intervals.len() - 1;
        state.active = Some(index);
        index
    }

    fn close(&mut self, key: EffectKey, at: Timestamp, reason: IntervalEnd) -> Option<usize> {
        let state = self.effects.get_mut(&key)?;
        let index = state.active.take()?;
        let interval = &mut state.intervals[index];
        interval.end = Some(at.max(interval.start));
        interval.ended_by = Some(reason);
        Some(index)
    }

    pub fn apply(&mut self, key: EffectKey, at: Timestamp, attributes: A) -> Transition {
        if self.is_active(key) {
            self.diagnostics.note(
                NoteKind::UnexpectedAuraTransition,
                Some(at),
                format!("{} applied on {} while active, treated as refresh", key.0, key.1),
            );
            return self.refresh(key, at, attributes);
        }
        Transition::Applied(self.open(key, at, attributes, 0, None))
    }

    pub fn refresh(&mut self, key: EffectKey, at: Timestamp, attributes: A) -> Transition {
        let remaining = self.remaining(key, at);
        let Some(previous) = self.close(key, at, IntervalEnd::Refresh) else {
            self.diagnostics.note(
                NoteKind::UnexpectedAuraTransition,
                Some(at),
                format!("{} refreshed on {} while inactive, treated as apply", key.0, key.1),
            );
            return Transition::Applied(self.open(key, at, attributes, 0, None));
        };
        let current = self.open(key, at, attributes, remaining, Some(previous));
        Transition::Refreshed(Refreshed { previous, current })
    }

    pub fn remove(&mut self, key: EffectKey, at: Timestamp) -> Transition {
        match self.close(key, at, IntervalEnd::Removal) {
            Some(index) => Transition::Removed(index),
            None => {
                self.diagnostics.note(
                    NoteKind::UnexpectedAuraTransition,
                    Some(at),
                    format!("{} removed from {} while inactive", key.0, key.1),
                );
                Transition::Ignored
            }
        }
    }

    /// Close every open interval, typically at the end of the session.
    pub fn close_all(&mut self, at: Timestamp) {
        let keys: Vec<EffectKey> = self
            .effects
            .iter()
            .filter(|(_, state)| state.active.is_some())
            .map(|(key, _)| *key)
            .collect();
        for key in keys {
            self.close(key, at, IntervalEnd::SessionEnd);
        }
    }

    pub fn is_active(&self, key: EffectKey) -> bool {
        self.active_interval(key).is_some()
    }

    pub fn active_interval(&self, key: EffectKey) -> Option<&Interval<A>> {
        let state = self.effects.get(&key)?;
        state.active.map(|index| &state.intervals[index])
    }

    /// Time left on the open interval at `at`, zero when inactive or unknown.
    pub fn remaining(&self, key: EffectKey, at: Timestamp) -> u64 {
        self.active_interval(key)
            .and_then(|interval| interval.expected_expiry)
            .map(|expiry| expiry.saturating_sub(at))
            .unwrap_or(0)
    }

    /// Whether the effect covered `at`, or ended no more than `buffer` ms before it.
    pub fn was_active(&self, key: EffectKey, at: Timestamp, buffer: u64) -> bool {
        self.intervals(key).iter().rev().any(|interval| {
            interval.covers(at)
                || interval
                    .end
                    .is_some_and(|end| interval.start <= at && end <= at && at - end <= buffer)
        })
    }

    pub fn intervals(&self, key: EffectKey) -> &[Interval<A>] {
        self.effects
            .get(&key)
            .map(|state| state.intervals.as_slice())
            .unwrap_or(&[])
    }

    pub fn interval(&self, key: EffectKey, index: usize) -> Option<&Interval<A>> {
        self.intervals(key).get(index)
    }

    pub fn keys(&self) -> impl Iterator<Item = EffectKey> + '_ {
        self.effects.keys().copied()
    }

    /// Actors currently carrying `ability`.
    pub fn active_on(&self, ability: AbilityId) -> impl Iterator<Item = ActorId> + '_ {
        self.effects
            .iter()
            .filter(move |((a, _), state)| *a == ability && state.active.is_some())
            .map(|((_, actor), _)| *actor)
    }

    /// Total covered time of `key` within `[from, to)`.
    pub fn uptime(&self, key: EffectKey, from: Timestamp, to: Timestamp) -> u64 {
        self.intervals(key)
            .iter()
            .map(|interval| {
                let start = interval.start.max(from);
                let end = interval.end.unwrap_or(to).min(to);
                end.saturating_sub(start)
            })
            .sum()
    }
}

/// Classification of one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Clean,
    /// Refreshed early with weaker attributes
    Downgrade,
    /// The replaced interval's premium attribute was lost with `lost` ms left
    EmpowermentLoss { lost: u64, significant: bool },
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshRules {
    pub forgiveness: u64,
}

impl RefreshRules {
    pub fn new(forgiveness: u64) -> Self {
        Self { forgiveness }
    }

    /// Judge a refresh at `at` that replaced `previous` with `current`.
    ///
    /// A refresh at or after the previous interval's pandemic start is never a
    /// downgrade, and neither is one that carries the premium attribute.
    pub fn classify<A: Snapshot>(
        &self,
        previous: &Interval<A>,
        current: &Interval<A>,
        at: Timestamp,
    ) -> RefreshKind {
        if previous.attributes.is_premium() && !current.attributes.is_premium() {
            let lost = previous
                .expected_expiry
                .map(|expiry| expiry.saturating_sub(at))
                .unwrap_or(0);
            return RefreshKind::EmpowermentLoss {
                lost,
                significant: lost > self.forgiveness,
            };
        }

        let early = previous.pandemic_start.is_some_and(|start| at < start);
        if early
            && !current.attributes.is_premium()
            && current.attributes.power() < previous.attributes.power()
        {
            RefreshKind::Downgrade
        } else {
            RefreshKind::Clean
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use proptest::prelude::*;
    use std::rc::Rc;

    const RAKE: AbilityId = AbilityId(155722);
    const TARGET: ActorId = ActorId(900);
    const KEY: EffectKey = (RAKE, TARGET);

    #[derive(Debug, Clone, PartialEq)]
    struct Power(f64, bool);

    impl Snapshot for Power {
        fn power(&self) -> f64 {
            self.0
        }

        fn is_premium(&self) -> bool {
            self.1
        }
    }

    fn tracker() -> TimedEffectTracker<Power> {
        TimedEffectTracker::new(0.3, Diagnostics::detached()).with_duration(RAKE, 15_000)
    }

    #[test]
    fn test_refresh_inside_pandemic_carries_capped_duration() {
        let mut t = tracker();
        t.apply(KEY, 0, Power(1.0, false));
        let first = &t.intervals(KEY)[0];
        assert_eq!(first.expected_expiry, Some(15_000));
        assert_eq!(first.pandemic_start, Some(10_500));

        let Transition::Refreshed(r) = t.refresh(KEY, 12_000, Power(1.0, false)) else {
            panic!("expected refresh");
        };
        // 3000 left, well under the 4500 cap
        assert_eq!(t.intervals(KEY)[r.current].expected_expiry, Some(30_000));
        assert_eq!(t.intervals(KEY)[r.previous].end, Some(12_000));
        assert_eq!(t.intervals(KEY)[r.current].previous, Some(r.previous));
    }

    #[test]
    fn test_early_refresh_is_capped_at_pandemic_window() {
        let mut t = tracker();
        t.apply(KEY, 0, Power(1.0, false));
        t.refresh(KEY, 1_000, Power(1.0, false));
        // 14000 left but only 4500 carries over
        assert_eq!(t.remaining(KEY, 1_000), 19_500);
    }

    #[test]
    fn test_consecutive_intervals_do_not_overlap() {
        let mut t = tracker();
        t.apply(KEY, 0, Power(1.0, false));
        t.refresh(KEY, 14_000, Power(0.5, false));
        t.remove(KEY, 29_000);

        let intervals = t.intervals(KEY);
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start, intervals[0].end), (0, Some(14_000)));
        assert_eq!((intervals[1].start, intervals[1].end), (14_000, Some(29_000)));
        assert!(!t.is_active(KEY));
    }

    #[test]
    fn test_refresh_classification() {
        let rules = RefreshRules::new(1_000);
        let mut t = tracker();
        t.apply(KEY, 0, Power(2.0, false));
        let Transition::Refreshed(r) = t.refresh(KEY, 9_000, Power(1.0, false)) else {
            panic!("expected refresh");
        };
        let intervals = t.intervals(KEY);
        assert_eq!(
            rules.classify(&intervals[r.previous], &intervals[r.current], 9_000),
            RefreshKind::Downgrade
        );

        let mut t = tracker();
        t.apply(KEY, 0, Power(2.0, false));
        let Transition::Refreshed(r) = t.refresh(KEY, 14_000, Power(1.0, false)) else {
            panic!("expected refresh");
        };
        let intervals = t.intervals(KEY);
        assert_eq!(
            rules.classify(&intervals[r.previous], &intervals[r.current], 14_000),
            RefreshKind::Clean
        );
    }

    #[test]
    fn test_early_premium_refresh_is_not_a_downgrade() {
        let rules = RefreshRules::new(1_000);
        let mut t = tracker();
        t.apply(KEY, 0, Power(2.0, false));
        let Transition::Refreshed(r) = t.refresh(KEY, 9_000, Power(1.0, true)) else {
            panic!("expected refresh");
        };
        let intervals = t.intervals(KEY);
        assert_eq!(
            rules.classify(&intervals[r.previous], &intervals[r.current], 9_000),
            RefreshKind::Clean
        );
    }

    #[test]
    fn test_premium_loss() {
        let rules = RefreshRules::new(1_000);
        let mut t = tracker();
        t.apply(KEY, 0, Power(2.0, true));
        let Transition::Refreshed(r) = t.refresh(KEY, 13_000, Power(2.0, false)) else {
            panic!("expected refresh");
        };
        let intervals = t.intervals(KEY);
        assert_eq!(
            rules.classify(&intervals[r.previous], &intervals[r.current], 13_000),
            RefreshKind::EmpowermentLoss {
                lost: 2_000,
                significant: true
            }
        );
    }

    #[test]
    fn test_inactive_transitions_recover_with_notes() {
        let sink = Rc::new(CollectingSink::new());
        let mut t = TimedEffectTracker::<()>::new(0.3, Diagnostics::new(sink.clone(), false));

        assert_eq!(t.remove(KEY, 100), Transition::Ignored);
        assert_eq!(t.refresh(KEY, 200, ()), Transition::Applied(0));
        assert_eq!(t.apply(KEY, 300, ()), Transition::Refreshed(Refreshed { previous: 0, current: 1 }));

        assert_eq!(sink.notes().len(), 3);
        assert!(sink
            .notes()
            .iter()
            .all(|n| n.kind == NoteKind::UnexpectedAuraTransition));
    }

    #[test]
    fn test_zero_length_interval_is_tolerated() {
        let mut t = TimedEffectTracker::<()>::new(0.3, Diagnostics::detached());
        t.apply(KEY, 500, ());
        t.remove(KEY, 500);
        assert_eq!(t.intervals(KEY)[0].duration(1_000), 0);
        assert!(!t.was_active(KEY, 501, 0));
        assert!(t.was_active(KEY, 550, 100));
    }

    #[test]
    fn test_uptime_and_close_all() {
        let mut t = TimedEffectTracker::<()>::new(0.3, Diagnostics::detached());
        t.apply(KEY, 1_000, ());
        t.remove(KEY, 3_000);
        t.apply(KEY, 8_000, ());
        t.close_all(10_000);

        assert_eq!(t.uptime(KEY, 0, 10_000), 4_000);
        assert_eq!(
            t.intervals(KEY)[1].ended_by,
            Some(IntervalEnd::SessionEnd)
        );
    }

    proptest! {
        #[test]
        fn prop_pandemic_refresh_is_never_a_downgrade(
            duration in 1_000u64..60_000,
            offset in 0u64..60_000,
            old_power in 0.1f64..4.0,
            new_power in 0.1f64..4.0,
        ) {
            let mut t = TimedEffectTracker::new(0.3, Diagnostics::detached())
                .with_duration(RAKE, duration);
            t.apply(KEY, 0, Power(old_power, false));
            let pandemic_start = t.intervals(KEY)[0].pandemic_start.unwrap_or(0);
            let at = pandemic_start + offset % (duration - pandemic_start + 1);

            let Transition::Refreshed(r) = t.refresh(KEY, at, Power(new_power, false)) else {
                panic!("expected refresh");
            };
            let intervals = t.intervals(KEY);
            prop_assert_ne!(
                RefreshRules::new(1_000).classify(&intervals[r.previous], &intervals[r.current], at),
                RefreshKind::Downgrade
            );
            prop_assert!(intervals[r.previous].end <= Some(intervals[r.current].start));
        }
    }
}
