use rotalyze_types::{EventKind, Timestamp};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Module '{module}' depends on '{dependency}', which is not registered")]
    UnresolvedDependency {
        module: &'static str,
        dependency: &'static str,
    },

    #[error("Cyclic module dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<&'static str> },

    #[error("Module '{module}' requested '{dependency}' without declaring it as a dependency")]
    UndeclaredDependency {
        module: &'static str,
        dependency: &'static str,
    },

    #[error("Failed to construct module '{module}': {source}")]
    Construction {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Module '{module}' failed on event #{event_index} ({kind} at {timestamp}ms): {source}")]
    Handler {
        module: &'static str,
        event_index: usize,
        timestamp: Timestamp,
        kind: EventKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Event #{index} is earlier than the event before it")]
    OutOfOrder { index: usize },

    #[error("Normalization failed: {0}")]
    Normalizer(#[from] rotalyze_normalizers::Error),

    #[error("Invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Exit code for the CLI: configuration problems are 2, everything else 1
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::UnresolvedDependency { .. }
            | EngineError::CyclicDependency { .. }
            | EngineError::UndeclaredDependency { .. }
            | EngineError::Config { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
