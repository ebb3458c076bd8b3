use rotalyze_types::{Event, RunContext};

/// One stage of the normalizer chain.
///
/// Responsibilities:
/// - Insert synthetic events (marked `fabricated`) for facts the recording missed
/// - Drop events it recognises as recording artifacts
/// - Keep the sequence sorted by timestamp; inserted events are placed by
///   timestamp, never at an arbitrary position
///
/// Implementations must be pure functions of the input and their own immutable
/// configuration: no clocks, no randomness.
pub trait EventNormalizer {
    /// Stage name used in errors and logs
    fn name(&self) -> &'static str;

    fn normalize(&self, events: Vec<Event>, ctx: &RunContext) -> Vec<Event>;
}
