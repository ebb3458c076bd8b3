use super::event::Event;
use crate::error::{Error, Result};

/// Decode an event sequence from either a JSON array or JSON-lines text.
///
/// Blank lines in JSON-lines input are skipped. Order is preserved as-is; the
/// caller decides whether an unordered sequence is acceptable.
pub fn parse_events(content: &str) -> Result<Vec<Event>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut events = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = serde_json::from_str(line).map_err(|e| Error::InvalidRecord {
            line: i + 1,
            reason: e.to_string(),
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Index of the first event whose timestamp is lower than its predecessor's.
pub fn first_out_of_order(events: &[Event]) -> Option<usize> {
    events
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
        .map(|i| i + 1)
}

/// Non-decreasing in `timestamp`.
pub fn is_time_ordered(events: &[Event]) -> bool {
    first_out_of_order(events).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn test_parse_json_array() {
        let events = parse_events(
            r#"[{"timestamp": 0, "type": "cast"}, {"timestamp": 5, "type": "fight_end"}]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind(), EventKind::FightEnd);
    }

    #[test]
    fn test_parse_json_lines() {
        let content = "{\"timestamp\": 0, \"type\": \"cast\"}\n\n{\"timestamp\": 1, \"type\": \"begin_channel\"}\n";
        let events = parse_events(content).unwrap();
        assert_eq!(events.len(), 2);
        assert!(is_time_ordered(&events));
    }

    #[test]
    fn test_parse_json_lines_reports_line() {
        let content = "{\"timestamp\": 0, \"type\": \"cast\"}\n{\"timestamp\": \"x\"}\n";
        match parse_events(content) {
            Err(Error::InvalidRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_first_out_of_order() {
        let events = parse_events(
            r#"[{"timestamp": 5, "type": "cast"}, {"timestamp": 5, "type": "cast"}, {"timestamp": 4, "type": "cast"}]"#,
        )
        .unwrap();
        assert_eq!(first_out_of_order(&events), Some(2));
        assert!(parse_events("").unwrap().is_empty());
    }
}
