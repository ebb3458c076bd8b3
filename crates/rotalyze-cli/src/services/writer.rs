use anyhow::{Context, Result};
use rotalyze_engine::{AnalysisReport, LedgerEntry};
use std::path::Path;

const LEDGER_PREFIX: &str = "ledger.";

/// Write every resource ledger attached to the report as one CSV table.
///
/// Returns the number of data rows written.
pub fn write_ledger_csv(path: &Path, report: &AnalysisReport) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;

    wtr.write_record([
        "resource",
        "timestamp",
        "ability",
        "amount_before",
        "change",
        "generated",
        "spent",
        "wasted",
        "amount_after",
    ])?;

    let mut rows = 0;
    for module in &report.modules {
        for (key, value) in &module.attachments {
            let Some(name) = key.strip_prefix(LEDGER_PREFIX) else {
                continue;
            };
            let entries: Vec<LedgerEntry> = serde_json::from_value(value.clone())
                .with_context(|| format!("Malformed ledger attachment '{}'", key))?;

            for entry in entries {
                wtr.write_record([
                    name.to_string(),
                    entry.timestamp.to_string(),
                    entry
                        .ability
                        .map(|a| a.raw().to_string())
                        .unwrap_or_default(),
                    entry.amount_before.to_string(),
                    entry.change.to_string(),
                    entry.generated.to_string(),
                    entry.spent.to_string(),
                    entry.wasted.to_string(),
                    entry.amount_after.to_string(),
                ])?;
                rows += 1;
            }
        }
    }

    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotalyze_engine::{AnalysisConfig, analyze};
    use rotalyze_testing::fixtures;

    #[test]
    fn test_ledger_rows_follow_resource_changes() {
        let session = fixtures::sample_session();
        let config = AnalysisConfig::from_toml_str(fixtures::SAMPLE_CONFIG).unwrap();
        let report = analyze(session.events, &session.context, &config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let rows = write_ledger_csv(&path, &report).unwrap();
        assert_eq!(rows, fixtures::SAMPLE_RESOURCE_CHANGES);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("resource,timestamp,ability,amount_before,change,generated,spent,wasted,amount_after")
        );
        assert_eq!(lines.next(), Some("maelstrom,1500,51505,0,10,10,0,0,10"));
        assert_eq!(lines.last(), Some("maelstrom,7500,8042,26,-20,0,20,0,6"));
    }
}
