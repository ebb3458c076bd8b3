pub mod context;
pub mod domain;
pub mod error;
pub mod event;
mod util;

pub use context::*;
pub use domain::*;
pub use error::{Error, Result};
pub use event::*;
pub use util::*;
