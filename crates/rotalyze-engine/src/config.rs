use rotalyze_normalizers::NormalizerConfig;
use rotalyze_types::{CapabilityId, ResourceType, RunContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::suggestions::SuggestionThresholds;

/// Tunable rules shared by every module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Share of the base duration that may be carried over on refresh
    pub pandemic_fraction: f64,

    /// Lost empowered duration below this is not worth flagging, ms
    pub refresh_forgiveness_ms: u64,

    /// A buff removed at most this long ago still counts as present, ms
    pub buff_buffer_ms: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            pandemic_fraction: 0.3,
            refresh_forgiveness_ms: 1_000,
            buff_buffer_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityBonus {
    pub capability: CapabilityId,
    pub amount: i64,
}

/// One tracked class resource (`[[resources]]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub resource: ResourceType,

    pub name: String,

    pub base_capacity: i64,

    #[serde(default)]
    pub initial: i64,

    #[serde(default)]
    pub capacity_bonuses: Vec<CapacityBonus>,

    /// Suggestion thresholds for waste per minute
    #[serde(default)]
    pub waste_per_minute: Option<SuggestionThresholds>,
}

impl ResourceSpec {
    /// Capacity for this run: base plus every bonus whose capability is unlocked.
    pub fn capacity(&self, run: &RunContext) -> i64 {
        self.base_capacity
            + self
                .capacity_bonuses
                .iter()
                .filter(|bonus| run.has_capability(bonus.capability))
                .map(|bonus| bonus.amount)
                .sum::<i64>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Forward module debug output to the diagnostic sink
    #[serde(default)]
    pub debug: bool,
}

/// Full analysis configuration, usually read from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Run context; the CLI requires it, library callers may pass their own
    #[serde(default)]
    pub run: Option<RunContext>,

    #[serde(default)]
    pub policy: Policy,

    #[serde(default)]
    pub resources: Vec<ResourceSpec>,

    #[serde(default)]
    pub normalizers: NormalizerConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Per-module settings tables, keyed by module name
    #[serde(default)]
    pub modules: BTreeMap<String, serde_json::Value>,
}

impl AnalysisConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|reason| EngineError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn with_module(mut self, name: &str, settings: serde_json::Value) -> Self {
        self.modules.insert(name.to_string(), settings);
        self
    }

    pub fn with_resource(mut self, spec: ResourceSpec) -> Self {
        self.resources.push(spec);
        self
    }

    pub fn module_settings(&self, name: &str) -> Option<&serde_json::Value> {
        self.modules.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotalyze_types::ActorId;

    const SAMPLE: &str = r#"
[run]
fight_start = 0
fight_end = 120000
selected_player = 1
capabilities = [22]

[policy]
pandemic_fraction = 0.25

[[resources]]
resource = 4
name = "combo_points"
base_capacity = 5
capacity_bonuses = [{ capability = 22, amount = 1 }]

[modules.active_time]
downtime = { minor = 0.05, average = 0.15, major = 0.25 }
"#;

    #[test]
    fn test_parse_full_config() {
        let config = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        let run = config.run.clone().unwrap();

        assert_eq!(run.selected_player, ActorId(1));
        assert_eq!(config.policy.pandemic_fraction, 0.25);
        // unspecified policy fields keep their defaults
        assert_eq!(config.policy.buff_buffer_ms, 100);
        assert_eq!(config.resources[0].capacity(&run), 6);
        assert!(config.module_settings("active_time").is_some());
        assert!(config.module_settings("dot_snapshot").is_none());
    }

    #[test]
    fn test_capacity_without_capability() {
        let config = AnalysisConfig::from_toml_str(SAMPLE).unwrap();
        let run = RunContext::new(ActorId(1), 0, 1000);
        assert_eq!(config.resources[0].capacity(&run), 5);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.run.is_none());
        assert_eq!(config.policy, Policy::default());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "policy = 3").unwrap();

        match AnalysisConfig::load_from(&path) {
            Err(EngineError::Config { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }
}
