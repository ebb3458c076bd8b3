use rotalyze_engine::{AnalysisReport, MetricValue, ModuleReport};
use rotalyze_types::{format_duration, format_percentage};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::presentation::Palette;

/// Full analysis report; JSON output is the report itself.
pub struct ReportView<'a> {
    report: &'a AnalysisReport,
    palette: Palette,
}

impl<'a> ReportView<'a> {
    pub fn new(report: &'a AnalysisReport, palette: Palette) -> Self {
        Self { report, palette }
    }

    fn write_module(&self, f: &mut fmt::Formatter<'_>, module: &ModuleReport) -> fmt::Result {
        if !module.active {
            return writeln!(
                f,
                "{} {}",
                self.palette.heading(&module.module),
                self.palette.dim("(disabled)")
            );
        }
        writeln!(f, "{}", self.palette.heading(&module.module))?;

        let width = module.metrics.keys().map(String::len).max().unwrap_or(0);
        for (name, value) in &module.metrics {
            let rendered = match value {
                MetricValue::Performance(p) => self.palette.performance(*p),
                other => other.render(),
            };
            writeln!(f, "  {:<width$}  {}", name, rendered, width = width)?;
        }
        for (name, value) in &module.attachments {
            let entries = value.as_array().map_or(1, Vec::len);
            writeln!(
                f,
                "  {}",
                self.palette.dim(&format!("{name}: {entries} entries (see --format json)"))
            )?;
        }
        for suggestion in &module.suggestions {
            writeln!(
                f,
                "  {} {} ({}, recommended {})",
                self.palette.suggestion(suggestion.severity),
                suggestion.message,
                suggestion.actual,
                suggestion.recommended
            )?;
        }
        Ok(())
    }
}

impl Serialize for ReportView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.report.serialize(serializer)
    }
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let run = &report.context;
        writeln!(
            f,
            "{} {} | fight {} - {} | {} events ({} fabricated)",
            self.palette.heading("Player"),
            run.selected_player,
            format_duration(run.fight_start),
            format_duration(run.fight_end),
            report.events_analyzed,
            report.fabricated_events
        )?;

        let active = report.modules.iter().filter(|m| m.active).count();
        writeln!(
            f,
            "{}",
            self.palette.dim(&format!(
                "{} of {} modules active",
                active,
                report.modules.len()
            ))
        )?;

        for module in &report.modules {
            writeln!(f)?;
            self.write_module(f, module)?;
        }

        if !report.annotations.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.palette.heading("Annotated events"))?;
            for annotated in &report.annotations {
                let ability = annotated
                    .ability
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    f,
                    "  {}  {:<14} {:<16} {} {}: {}",
                    format_duration(run.relative(annotated.timestamp)),
                    annotated.kind.to_string(),
                    ability,
                    annotated.meta.verdict,
                    self.palette.annotation(annotated.meta.severity),
                    annotated.meta.reason
                )?;
            }
        }

        if !report.notes.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.palette.heading("Data quality notes"))?;
            for note in &report.notes {
                let at = note
                    .timestamp
                    .map(|ts| format!(" at {}", format_duration(run.relative(ts))))
                    .unwrap_or_default();
                writeln!(
                    f,
                    "  {} {}{}: {}",
                    note.module,
                    note.kind.as_str(),
                    at,
                    note.message
                )?;
            }
        }

        let suggestions = report.suggestions().count();
        writeln!(f)?;
        writeln!(
            f,
            "{}",
            self.palette.dim(&match suggestions {
                0 => "No suggestions".to_string(),
                1 => "1 suggestion".to_string(),
                n => format!("{n} suggestions"),
            })
        )?;
        if let Some(active_ratio) = report
            .module("active_time")
            .and_then(|m| m.metric("active_ratio"))
            .and_then(MetricValue::as_f64)
        {
            writeln!(
                f,
                "{}",
                self.palette
                    .dim(&format!("Active time {}", format_percentage(active_ratio)))
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotalyze_engine::{AnalysisConfig, analyze};
    use rotalyze_testing::fixtures;

    fn sample_report() -> AnalysisReport {
        let session = fixtures::sample_session();
        let config = AnalysisConfig::from_toml_str(fixtures::SAMPLE_CONFIG).unwrap();
        analyze(session.events, &session.context, &config).unwrap()
    }

    #[test]
    fn test_plain_report_lists_every_module() {
        let report = sample_report();
        let text = ReportView::new(&report, Palette::plain()).to_string();

        assert!(text.starts_with("Player actor:1 | fight 0:00.000 - 0:20.000"));
        for module in &report.modules {
            assert!(text.contains(&module.module), "missing {}", module.module);
        }
        assert!(text.contains("spender_windows (disabled)"));
        assert!(text.contains("ledger.maelstrom: 4 entries"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_json_view_is_the_report() {
        let report = sample_report();
        let view = serde_json::to_value(ReportView::new(&report, Palette::plain())).unwrap();
        assert_eq!(view, serde_json::to_value(&report).unwrap());
    }
}
