use rotalyze_types::{AbilityId, Event, EventKind, Timestamp};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, NoteKind};
use crate::performance::QualitativePerformance;

/// Event recorded inside a window, by its position in the normalized sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubEvent {
    pub index: usize,
    pub timestamp: Timestamp,
    pub kind: EventKind,
    pub ability: Option<AbilityId>,
}

impl SubEvent {
    pub fn from_event(index: usize, event: &Event) -> Self {
        Self {
            index,
            timestamp: event.timestamp,
            kind: event.kind(),
            ability: event.ability,
        }
    }

    pub fn is_any(&self, abilities: &[AbilityId]) -> bool {
        self.ability.is_some_and(|a| abilities.contains(&a))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenWindow<S> {
    pub start: Timestamp,
    pub sub_events: Vec<SubEvent>,
    pub state: S,
}

#[derive(Debug, Clone, Serialize)]
pub struct Window<S> {
    pub start: Timestamp,
    pub end: Timestamp,
    pub sub_events: Vec<SubEvent>,
    pub state: S,
    pub performance: Option<QualitativePerformance>,
}

/// Trigger-bounded windows of activity.
///
/// A window opens on a trigger, collects sub-events and is closed by the
/// closing trigger. A window that is still open when the session ends is
/// discarded rather than evaluated.
pub struct WindowTracker<S> {
    open: Option<OpenWindow<S>>,
    closed: Vec<Window<S>>,
    discarded: usize,
    diagnostics: Diagnostics,
}

impl<S> WindowTracker<S> {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            open: None,
            closed: Vec::new(),
            discarded: 0,
            diagnostics,
        }
    }

    /// Open a window. Returns false, leaving the current window alone, if one is already open.
    pub fn open(&mut self, at: Timestamp, state: S) -> bool {
        if self.open.is_some() {
            return false;
        }
        self.open = Some(OpenWindow {
            start: at,
            sub_events: Vec::new(),
            state,
        });
        true
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn current(&self) -> Option<&OpenWindow<S>> {
        self.open.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut OpenWindow<S>> {
        self.open.as_mut()
    }

    /// Record a sub-event in the open window, if any.
    pub fn push(&mut self, sub_event: SubEvent) -> bool {
        match self.open.as_mut() {
            Some(window) => {
                window.sub_events.push(sub_event);
                true
            }
            None => false,
        }
    }

    /// Close the open window and hand it back for evaluation.
    pub fn close(&mut self, at: Timestamp) -> Option<&mut Window<S>> {
        let open = self.open.take()?;
        self.closed.push(Window {
            start: open.start,
            end: at.max(open.start),
            sub_events: open.sub_events,
            state: open.state,
            performance: None,
        });
        self.closed.last_mut()
    }

    /// Drop a window left open at session end.
    pub fn finish(&mut self, at: Timestamp) {
        if let Some(open) = self.open.take() {
            self.discarded += 1;
            self.diagnostics.note(
                NoteKind::DiscardedWindow,
                Some(at),
                format!(
                    "window opened at {} never closed, discarded",
                    open.start
                ),
            );
        }
    }

    pub fn windows(&self) -> &[Window<S>] {
        &self.closed
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn count_where(&self, predicate: impl Fn(&Window<S>) -> bool) -> usize {
        self.closed.iter().filter(|w| predicate(w)).count()
    }
}

/// Consumers that must directly follow a producer.
///
/// A consumer is satisfied only by the sub-event immediately before it being a
/// producer (or by the window's starting state, for the first sub-events when
/// `primed` is set). Each producer satisfies one consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingRule {
    pub producers: Vec<AbilityId>,
    pub consumers: Vec<AbilityId>,

    /// Reason attached to violating events
    pub reason: String,

    /// Worst tier a window with a violation may still earn
    #[serde(default = "default_cap")]
    pub cap: QualitativePerformance,
}

fn default_cap() -> QualitativePerformance {
    QualitativePerformance::Ok
}

/// Positions (into `sub_events`) of consumers that were not preceded by a producer.
pub fn check_preceded_by(sub_events: &[SubEvent], rule: &OrderingRule, primed: bool) -> Vec<usize> {
    let mut produced = primed;
    let mut violations = Vec::new();
    for (position, sub) in sub_events.iter().enumerate() {
        if sub.is_any(&rule.consumers) {
            if !produced {
                violations.push(position);
            }
            produced = false;
        }
        if sub.is_any(&rule.producers) {
            produced = true;
        } else if !sub.is_any(&rule.consumers) {
            produced = false;
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use std::rc::Rc;

    const LAVA_BURST: AbilityId = AbilityId(51505);
    const LIGHTNING_BOLT: AbilityId = AbilityId(188196);
    const FLAME_SHOCK: AbilityId = AbilityId(188389);

    fn sub(index: usize, ability: AbilityId) -> SubEvent {
        SubEvent {
            index,
            timestamp: index as u64 * 1_000,
            kind: EventKind::Cast,
            ability: Some(ability),
        }
    }

    fn rule() -> OrderingRule {
        OrderingRule {
            producers: vec![LAVA_BURST],
            consumers: vec![LIGHTNING_BOLT],
            reason: "cast Lava Burst before Lightning Bolt".into(),
            cap: QualitativePerformance::Ok,
        }
    }

    #[test]
    fn test_open_push_close() {
        let mut tracker = WindowTracker::new(Diagnostics::detached());
        assert!(!tracker.push(sub(0, LAVA_BURST)));

        assert!(tracker.open(1_000, 3u32));
        assert!(!tracker.open(1_100, 4u32));
        tracker.push(sub(1, LAVA_BURST));
        let window = tracker.close(2_000).expect("window was open");

        assert_eq!(window.start, 1_000);
        assert_eq!(window.end, 2_000);
        assert_eq!(window.state, 3);
        assert_eq!(window.sub_events.len(), 1);
        assert_eq!(tracker.windows().len(), 1);
    }

    #[test]
    fn test_unclosed_window_is_discarded() {
        let sink = Rc::new(CollectingSink::new());
        let mut tracker = WindowTracker::new(Diagnostics::new(sink.clone(), false));
        tracker.open(5_000, ());
        tracker.finish(9_000);

        assert_eq!(tracker.discarded(), 1);
        assert!(tracker.windows().is_empty());
        assert_eq!(sink.notes()[0].kind, NoteKind::DiscardedWindow);
    }

    #[test]
    fn test_ordering_scan() {
        let subs = [
            sub(0, LAVA_BURST),
            sub(1, LIGHTNING_BOLT),
            sub(2, FLAME_SHOCK),
            sub(3, LAVA_BURST),
            sub(4, FLAME_SHOCK),
            sub(5, LIGHTNING_BOLT),
        ];
        // the producer at 3 was separated from its consumer by an unrelated cast
        assert_eq!(check_preceded_by(&subs, &rule(), false), vec![5]);
    }

    #[test]
    fn test_primed_window_allows_leading_consumer() {
        let subs = [sub(0, LIGHTNING_BOLT), sub(1, LIGHTNING_BOLT)];
        assert_eq!(check_preceded_by(&subs, &rule(), true), vec![1]);
        assert_eq!(check_preceded_by(&subs, &rule(), false), vec![0, 1]);
    }
}
