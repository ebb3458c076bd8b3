//! Custom assertions for rotalyze-specific validation.
//!
//! Provides high-level checks on the JSON report printed by `rotalyze analyze
//! --format json`:
//! - Module presence and activity
//! - Metric values
//! - Suggestion counts

use anyhow::{Context, Result};
use serde_json::Value;

/// Find a module section by name.
pub fn module<'a>(json: &'a Value, name: &str) -> Result<&'a Value> {
    json["modules"]
        .as_array()
        .context("Expected 'modules' array in JSON")?
        .iter()
        .find(|m| m["module"] == name)
        .with_context(|| format!("Module '{}' missing from report", name))
}

/// Assert that the report lists exactly these modules, in this order.
pub fn assert_module_order(json: &Value, expected: &[&str]) -> Result<()> {
    let names: Vec<&str> = json["modules"]
        .as_array()
        .context("Expected 'modules' array in JSON")?
        .iter()
        .filter_map(|m| m["module"].as_str())
        .collect();

    if names != expected {
        anyhow::bail!("Expected modules {:?}, got {:?}", expected, names);
    }
    Ok(())
}

pub fn assert_module_active(json: &Value, name: &str, expected: bool) -> Result<()> {
    let active = module(json, name)?["active"]
        .as_bool()
        .with_context(|| format!("Module '{}' has no 'active' flag", name))?;

    if active != expected {
        anyhow::bail!(
            "Expected module '{}' active={}, got active={}",
            name,
            expected,
            active
        );
    }
    Ok(())
}

/// Assert a metric's serialized value (the `value` half of `{kind, value}`).
pub fn assert_metric(json: &Value, name: &str, metric: &str, expected: Value) -> Result<()> {
    let value = &module(json, name)?["metrics"][metric]["value"];
    if value.is_null() {
        anyhow::bail!("Module '{}' has no metric '{}'", name, metric);
    }
    if *value != expected {
        anyhow::bail!(
            "Metric {}.{}: expected {}, got {}",
            name,
            metric,
            expected,
            value
        );
    }
    Ok(())
}

pub fn assert_suggestion_count(json: &Value, name: &str, expected: usize) -> Result<()> {
    let suggestions = module(json, name)?["suggestions"]
        .as_array()
        .with_context(|| format!("Module '{}' has no 'suggestions' array", name))?;

    if suggestions.len() != expected {
        anyhow::bail!(
            "Expected {} suggestions from '{}', got {}",
            expected,
            name,
            suggestions.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> Value {
        json!({
            "modules": [
                { "module": "active_time", "active": true,
                  "metrics": { "active_ratio": { "kind": "ratio", "value": 0.5 } },
                  "suggestions": [] },
                { "module": "resources", "active": false, "metrics": {}, "suggestions": [] }
            ]
        })
    }

    #[test]
    fn test_module_assertions() {
        let json = report();
        assert!(assert_module_order(&json, &["active_time", "resources"]).is_ok());
        assert!(assert_module_order(&json, &["resources"]).is_err());
        assert!(assert_module_active(&json, "resources", false).is_ok());
        assert!(assert_module_active(&json, "missing", true).is_err());
    }

    #[test]
    fn test_metric_assertions() {
        let json = report();
        assert!(assert_metric(&json, "active_time", "active_ratio", json!(0.5)).is_ok());
        assert!(assert_metric(&json, "active_time", "active_ratio", json!(0.6)).is_err());
        assert!(assert_metric(&json, "active_time", "downtime", json!(0)).is_err());
        assert!(assert_suggestion_count(&json, "active_time", 0).is_ok());
    }
}
