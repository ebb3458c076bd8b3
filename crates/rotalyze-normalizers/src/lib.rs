// Error types
pub mod error;

// Trait-based architecture (public API)
pub mod traits;

// Ordered insertion helpers shared by stages
pub mod insert;

// Chain runner
pub mod chain;

// Stage implementations
pub mod precast;
pub mod prepull_buffs;

// Stage registry (configuration -> chain)
pub mod registry;

pub use chain::NormalizerChain;
pub use error::{Error, Result};
pub use insert::{Placement, insert_sorted};
pub use precast::{PrecastNormalizer, PrecastSpec};
pub use prepull_buffs::{PrepullBuffNormalizer, PrepullBuffSpec};
pub use registry::{NormalizerConfig, build_chain};
pub use traits::EventNormalizer;
