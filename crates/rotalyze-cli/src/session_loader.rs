use anyhow::{Context, Result};
use rotalyze_types::{Event, parse_events};
use std::path::Path;

/// Read an event file in the engine's own JSON representation.
pub fn load_events(path: &Path) -> Result<Vec<Event>> {
    if !path.exists() {
        anyhow::bail!("Event file not found: {}", path.display());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let events =
        parse_events(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::debug!(path = %path.display(), events = events.len(), "loaded events");
    Ok(events)
}
