use serde::{Deserialize, Serialize};

use crate::chain::NormalizerChain;
use crate::precast::{PrecastNormalizer, PrecastSpec};
use crate::prepull_buffs::{PrepullBuffNormalizer, PrepullBuffSpec};

/// `[normalizers]` section of the analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_true")]
    pub prepull_buffs: bool,

    #[serde(flatten)]
    pub prepull: PrepullBuffSpec,

    #[serde(default)]
    pub precast: Vec<PrecastSpec>,
}

fn default_true() -> bool {
    true
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            prepull_buffs: true,
            prepull: PrepullBuffSpec::default(),
            precast: Vec::new(),
        }
    }
}

/// Build the chain in its fixed stage order: prepull auras first, then precasts.
pub fn build_chain(config: &NormalizerConfig) -> NormalizerChain {
    let mut chain = NormalizerChain::new();
    if config.prepull_buffs {
        chain.push(PrepullBuffNormalizer::new(config.prepull.clone()));
    }
    for spec in &config.precast {
        chain.push(PrecastNormalizer::new(spec.clone()));
    }
    chain
}
