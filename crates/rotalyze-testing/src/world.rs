//! TestWorld pattern for declarative CLI integration test setup.
//!
//! Provides a fluent interface for:
//! - Creating an isolated working directory
//! - Writing event and configuration files into it
//! - Executing CLI commands with proper context

use anyhow::Result;
use assert_cmd::Command;
use rotalyze_types::Event;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::session::Session;

/// Default file names used by the `with_*` helpers.
pub const EVENTS_FILE: &str = "events.json";
pub const CONFIG_FILE: &str = "rotalyze.toml";

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use rotalyze_testing::{TestWorld, fixtures};
///
/// let world = TestWorld::new()
///     .with_session(&fixtures::sample_session())
///     .with_config(fixtures::SAMPLE_CONFIG);
///
/// let result = world
///     .run(&["analyze", "--events", "events.json", "--config", "rotalyze.toml"])
///     .unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    env_vars: HashMap<String, String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            env_vars: HashMap::new(),
        }
    }

    /// Working directory of every command run from this world.
    pub fn cwd(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a file inside the world.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Set an environment variable for CLI execution.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Write an arbitrary file (relative to the world root).
    pub fn with_file(self, name: &str, content: &str) -> Self {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        self
    }

    /// Write `events` as a JSON array to `events.json`.
    pub fn with_events(self, events: &[Event]) -> Self {
        let content = serde_json::to_string_pretty(events).expect("Failed to encode events");
        self.with_file(EVENTS_FILE, &content)
    }

    pub fn with_session(self, session: &Session) -> Self {
        self.with_events(&session.events)
    }

    /// Write `content` to `rotalyze.toml`.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(CONFIG_FILE, content)
    }

    pub fn read(&self, name: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.path(name))?)
    }

    /// Configure a CLI command with this test environment's settings.
    ///
    /// The caller must provide the base command (e.g., from `cargo_bin_cmd!("rotalyze")`).
    /// Logging is reduced to errors so that stderr only carries failures.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--log-level").arg("error");
        cmd.current_dir(self.cwd());
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }

    /// Execute the `rotalyze` binary with `args` and capture its output.
    ///
    /// Requires `CARGO_BIN_EXE_rotalyze`, which cargo sets for integration
    /// tests of the CLI crate.
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("rotalyze")
            .map_err(|e| anyhow::anyhow!("Failed to find rotalyze binary: {}", e))?;
        self.configure_command(&mut cmd);
        cmd.args(args);

        let output = cmd.output()?;
        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Parse stdout as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
