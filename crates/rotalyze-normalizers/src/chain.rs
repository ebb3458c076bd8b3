use rotalyze_types::{Event, RunContext, first_out_of_order};

use crate::error::{Error, Result};
use crate::traits::EventNormalizer;

/// Ordered pipeline of normalizer stages, applied once before dispatch.
#[derive(Default)]
pub struct NormalizerChain {
    stages: Vec<Box<dyn EventNormalizer>>,
}

impl NormalizerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl EventNormalizer + 'static) -> Self {
        self.push(stage);
        self
    }

    pub fn push(&mut self, stage: impl EventNormalizer + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in declaration order.
    ///
    /// The input must already be time ordered, and every stage must keep it so.
    pub fn run(&self, events: Vec<Event>, ctx: &RunContext) -> Result<Vec<Event>> {
        if let Some(index) = first_out_of_order(&events) {
            return Err(Error::UnorderedInput { index });
        }

        let mut events = events;
        for stage in &self.stages {
            let before = events.len();
            events = stage.normalize(events, ctx);

            if let Some(index) = first_out_of_order(&events) {
                return Err(Error::OrderViolated {
                    normalizer: stage.name(),
                    index,
                });
            }

            tracing::debug!(
                normalizer = stage.name(),
                before,
                after = events.len(),
                "normalizer stage applied"
            );
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotalyze_types::{ActorId, EventPayload};

    struct Reverse;

    impl EventNormalizer for Reverse {
        fn name(&self) -> &'static str {
            "reverse"
        }

        fn normalize(&self, mut events: Vec<Event>, _ctx: &RunContext) -> Vec<Event> {
            events.reverse();
            events
        }
    }

    struct DropFightEnd;

    impl EventNormalizer for DropFightEnd {
        fn name(&self) -> &'static str {
            "drop_fight_end"
        }

        fn normalize(&self, events: Vec<Event>, _ctx: &RunContext) -> Vec<Event> {
            events
                .into_iter()
                .filter(|e| !matches!(e.payload, EventPayload::FightEnd))
                .collect()
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(ActorId(1), 0, 100)
    }

    fn sample() -> Vec<Event> {
        vec![
            Event::new(0, EventPayload::BeginChannel),
            Event::new(50, EventPayload::FightEnd),
        ]
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = NormalizerChain::new();
        assert_eq!(chain.run(sample(), &ctx()).unwrap(), sample());
    }

    #[test]
    fn test_stage_breaking_order_is_rejected() {
        let chain = NormalizerChain::new()
            .with_stage(DropFightEnd)
            .with_stage(Reverse);
        // a single event stays ordered when reversed
        assert_eq!(chain.run(sample(), &ctx()).unwrap().len(), 1);

        let chain = NormalizerChain::new().with_stage(Reverse);
        match chain.run(sample(), &ctx()) {
            Err(Error::OrderViolated { normalizer, .. }) => assert_eq!(normalizer, "reverse"),
            other => panic!("unexpected result: {:?}", other.map(|e| e.len())),
        }
    }

    #[test]
    fn test_unordered_input_is_rejected() {
        let mut events = sample();
        events.reverse();
        let chain = NormalizerChain::new().with_stage(DropFightEnd);
        assert!(matches!(
            chain.run(events, &ctx()),
            Err(Error::UnorderedInput { index: 1 })
        ));
        assert_eq!(chain.stage_names(), vec!["drop_fight_end"]);
    }
}
