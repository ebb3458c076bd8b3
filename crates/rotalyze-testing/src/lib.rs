//! Testing infrastructure for rotalyze tests.
//!
//! This crate provides utilities for writing robust tests:
//! - `SessionBuilder`: Fluent construction of time-ordered event sequences
//! - `assertions`: Custom assertions for the CLI's JSON report
//! - `fixtures`: A sample session and its configuration file
//! - `TestWorld`: Isolated temp directory for CLI integration tests

pub mod assertions;
pub mod fixtures;
pub mod session;
pub mod world;

pub use session::{Session, SessionBuilder};
pub use world::{CliResult, TestWorld};
