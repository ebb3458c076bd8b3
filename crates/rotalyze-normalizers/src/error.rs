use std::fmt;

/// Result type for rotalyze-normalizers operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the normalizer layer
#[derive(Debug)]
pub enum Error {
    /// A stage returned a sequence that is no longer sorted by timestamp
    OrderViolated {
        normalizer: &'static str,
        index: usize,
    },

    /// Input handed to the chain was already unordered
    UnorderedInput { index: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OrderViolated { normalizer, index } => write!(
                f,
                "Normalizer '{}' broke timestamp ordering at event {}",
                normalizer, index
            ),
            Error::UnorderedInput { index } => {
                write!(f, "Input events are not time ordered at event {}", index)
            }
        }
    }
}

impl std::error::Error for Error {}
