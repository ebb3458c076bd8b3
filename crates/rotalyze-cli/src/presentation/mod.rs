//! # Presentation Layer
//!
//! ```text
//! [ Handler ] --> [ View ] --> [ Renderer ] ==(JSON)==> [ serde_json ] --> Output
//!                  (Data)       (Driver)   ==(Text)==> [ Display ]    --> Output
//! ```
//!
//! Views wrap engine results. They serialize to the JSON output unchanged and
//! implement `Display` for plain text, so handlers never print directly.

pub mod palette;
pub mod renderers;
pub mod views;

pub use palette::Palette;
pub use renderers::{ConsoleRenderer, Renderer};
