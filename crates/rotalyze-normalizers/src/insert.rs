use rotalyze_types::Event;

/// Where an inserted event lands relative to events sharing its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Before every existing event with the same timestamp (inferred causes)
    BeforeTies,
    /// After every existing event with the same timestamp (inferred consequences)
    AfterTies,
}

/// Insert `event` into a time-ordered sequence without breaking the order.
/// Returns the index it was inserted at.
pub fn insert_sorted(events: &mut Vec<Event>, event: Event, placement: Placement) -> usize {
    let ts = event.timestamp;
    let index = match placement {
        Placement::BeforeTies => events.partition_point(|e| e.timestamp < ts),
        Placement::AfterTies => events.partition_point(|e| e.timestamp <= ts),
    };
    events.insert(index, event);
    index
}
