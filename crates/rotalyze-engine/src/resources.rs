//! Capacity-bounded resource accounting.
//!
//! Every change is turned into one ledger entry that splits it into generated,
//! spent and wasted amounts:
//!
//! - generation past capacity is wasted, the rest raises the amount
//! - expenditure can only spend what is there; going below zero clamps
//!
//! so that `generated - spent - wasted == current - initial` at every point.

use rotalyze_types::{AbilityId, ResourceType, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostics, NoteKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: Timestamp,
    pub resource: ResourceType,
    pub ability: Option<AbilityId>,
    pub amount_before: i64,
    pub amount_after: i64,
    pub change: i64,
    pub generated: i64,
    pub spent: i64,
    pub wasted: i64,
}

/// Point on the resource graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphPoint {
    pub timestamp: Timestamp,
    pub amount_before: i64,
    pub amount_after: i64,
    pub cumulative_waste: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AbilityResourceStats {
    pub generated: i64,
    pub spent: i64,
    pub wasted: i64,
}

impl AbilityResourceStats {
    fn add(&mut self, generated: i64, spent: i64, wasted: i64) {
        self.generated = self.generated.saturating_add(generated);
        self.spent = self.spent.saturating_add(spent);
        self.wasted = self.wasted.saturating_add(wasted);
    }
}

pub struct ResourceTracker {
    resource: ResourceType,
    capacity: i64,
    initial: i64,
    current: i64,
    ledger: Vec<LedgerEntry>,
    by_ability: BTreeMap<AbilityId, AbilityResourceStats>,
    totals: AbilityResourceStats,
    diagnostics: Diagnostics,
}

impl ResourceTracker {
    /// `initial` is clamped into `[0, capacity]`.
    pub fn new(
        resource: ResourceType,
        capacity: i64,
        initial: i64,
        diagnostics: Diagnostics,
    ) -> Self {
        let capacity = capacity.max(0);
        let initial = initial.clamp(0, capacity);
        Self {
            resource,
            capacity,
            initial,
            current: initial,
            ledger: Vec::new(),
            by_ability: BTreeMap::new(),
            totals: AbilityResourceStats::default(),
            diagnostics,
        }
    }

    /// Apply one change and append its ledger entry.
    ///
    /// `recorded_waste` is the waste reported by the event, if any; it is only
    /// cross-checked, the computed value is authoritative.
    pub fn record(
        &mut self,
        timestamp: Timestamp,
        ability: Option<AbilityId>,
        change: i64,
        recorded_waste: Option<i64>,
    ) -> &LedgerEntry {
        let before = self.current;
        let raw = before.saturating_add(change);
        let (after, generated, spent, wasted) = if change >= 0 {
            let wasted = (raw - self.capacity).max(0);
            (raw - wasted, raw - before, 0, wasted)
        } else if raw < 0 {
            self.diagnostics.note(
                NoteKind::ClampedResource,
                Some(timestamp),
                format!(
                    "{} spent {} with only {} available, clamped to zero",
                    self.resource,
                    change.unsigned_abs(),
                    before
                ),
            );
            (0, 0, before, 0)
        } else {
            (raw, 0, before - raw, 0)
        };

        if let Some(reported) = recorded_waste
            && reported != wasted
        {
            self.diagnostics.note(
                NoteKind::WasteMismatch,
                Some(timestamp),
                format!(
                    "{} reported waste {} but {} was computed",
                    self.resource, reported, wasted
                ),
            );
        }

        self.current = after;
        self.totals.add(generated, spent, wasted);
        if let Some(ability) = ability {
            self.by_ability
                .entry(ability)
                .or_default()
                .add(generated, spent, wasted);
        }

        self.ledger.push(LedgerEntry {
            timestamp,
            resource: self.resource,
            ability,
            amount_before: before,
            amount_after: after,
            change,
            generated,
            spent,
            wasted,
        });
        &self.ledger[self.ledger.len() - 1]
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    pub fn initial(&self) -> i64 {
        self.initial
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    fn ability_stats(&self, ability: AbilityId) -> AbilityResourceStats {
        self.by_ability.get(&ability).copied().unwrap_or_default()
    }

    pub fn generated_by(&self, ability: AbilityId) -> i64 {
        self.ability_stats(ability).generated
    }

    pub fn spent_by(&self, ability: AbilityId) -> i64 {
        self.ability_stats(ability).spent
    }

    pub fn wasted_by(&self, ability: AbilityId) -> i64 {
        self.ability_stats(ability).wasted
    }

    pub fn generated_total(&self) -> i64 {
        self.totals.generated
    }

    pub fn spent_total(&self) -> i64 {
        self.totals.spent
    }

    pub fn wasted_total(&self) -> i64 {
        self.totals.wasted
    }

    pub fn by_ability(&self) -> &BTreeMap<AbilityId, AbilityResourceStats> {
        &self.by_ability
    }

    /// Amount after every change at or before `timestamp` was applied.
    pub fn as_of(&self, timestamp: Timestamp) -> i64 {
        let applied = self.ledger.partition_point(|e| e.timestamp <= timestamp);
        match applied {
            0 => self.initial,
            n => self.ledger[n - 1].amount_after,
        }
    }

    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    pub fn graph_points(&self) -> Vec<GraphPoint> {
        let mut cumulative_waste = 0;
        self.ledger
            .iter()
            .map(|entry| {
                cumulative_waste += entry.wasted;
                GraphPoint {
                    timestamp: entry.timestamp,
                    amount_before: entry.amount_before,
                    amount_after: entry.amount_after,
                    cumulative_waste,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Diagnostics};
    use proptest::prelude::*;
    use std::rc::Rc;

    const CP: ResourceType = ResourceType(4);
    const SHRED: AbilityId = AbilityId(5221);
    const RIP: AbilityId = AbilityId(1079);

    fn tracker(capacity: i64) -> ResourceTracker {
        ResourceTracker::new(CP, capacity, 0, Diagnostics::detached())
    }

    #[test]
    fn test_overflow_is_wasted() {
        let mut t = tracker(5);
        t.record(1_000, Some(SHRED), 3, None);
        let entry = t.record(2_000, Some(SHRED), 3, None).clone();

        assert_eq!(entry.amount_before, 3);
        assert_eq!(entry.amount_after, 5);
        assert_eq!(entry.wasted, 1);
        assert_eq!(t.generated_by(SHRED), 6);
        assert_eq!(t.wasted_by(SHRED), 1);
        assert_eq!(t.current(), 5);
    }

    #[test]
    fn test_spend_and_as_of() {
        let mut t = tracker(5);
        t.record(1_000, Some(SHRED), 4, None);
        t.record(3_000, Some(RIP), -4, None);

        assert_eq!(t.spent_by(RIP), 4);
        assert_eq!(t.as_of(500), 0);
        assert_eq!(t.as_of(1_000), 4);
        assert_eq!(t.as_of(2_999), 4);
        assert_eq!(t.as_of(3_000), 0);
        assert_eq!(t.graph_points().len(), 2);
    }

    #[test]
    fn test_negative_amount_is_clamped_with_note() {
        let sink = Rc::new(CollectingSink::new());
        let diagnostics = Diagnostics::new(sink.clone(), false).for_module("resources");
        let mut t = ResourceTracker::new(CP, 5, 2, diagnostics);

        let entry = t.record(100, Some(RIP), -5, None).clone();

        assert_eq!(entry.amount_after, 0);
        assert_eq!(entry.spent, 2);
        assert_eq!(sink.notes()[0].kind, NoteKind::ClampedResource);
    }

    #[test]
    fn test_extreme_amounts_saturate() {
        let mut t = tracker(5);
        let entry = t.record(100, Some(SHRED), i64::MAX, None).clone();
        assert_eq!(entry.amount_after, 5);
        assert_eq!(entry.wasted, i64::MAX - 5);

        let entry = t.record(200, Some(RIP), i64::MIN, None).clone();
        assert_eq!(entry.amount_after, 0);
        assert_eq!(entry.spent, 5);
        assert_eq!(t.generated_total(), i64::MAX);
        assert_eq!(t.current(), 0);
    }

    #[test]
    fn test_recorded_waste_disagreement_is_noted() {
        let sink = Rc::new(CollectingSink::new());
        let mut t = ResourceTracker::new(CP, 5, 5, Diagnostics::new(sink.clone(), false));

        let entry = t.record(100, Some(SHRED), 1, Some(0)).clone();

        assert_eq!(entry.wasted, 1);
        assert_eq!(sink.notes()[0].kind, NoteKind::WasteMismatch);
    }

    proptest! {
        #[test]
        fn prop_ledger_balances(
            capacity in 0i64..20,
            initial in 0i64..20,
            changes in prop::collection::vec(-8i64..8, 0..64),
        ) {
            let mut t = ResourceTracker::new(CP, capacity, initial, Diagnostics::detached());
            for (i, change) in changes.iter().enumerate() {
                let entry = t.record(i as u64 * 100, Some(SHRED), *change, None).clone();
                prop_assert!(entry.amount_after >= 0 && entry.amount_after <= t.capacity());
                prop_assert_eq!(
                    entry.generated - entry.spent - entry.wasted,
                    entry.amount_after - entry.amount_before
                );
            }
            prop_assert_eq!(
                t.generated_total() - t.spent_total() - t.wasted_total(),
                t.current() - t.initial()
            );
        }
    }
}
