use owo_colors::OwoColorize;
use rotalyze_engine::{QualitativePerformance, SuggestionSeverity};
use rotalyze_types::AnnotationSeverity;

/// Colors for plain output; every method returns the bare text when disabled.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn heading(&self, text: &str) -> String {
        if self.enabled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn dim(&self, text: &str) -> String {
        if self.enabled {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn performance(&self, performance: QualitativePerformance) -> String {
        let text = performance.as_str();
        if !self.enabled {
            return text.to_string();
        }
        match performance {
            QualitativePerformance::Perfect => text.green().bold().to_string(),
            QualitativePerformance::Good => text.green().to_string(),
            QualitativePerformance::Ok => text.yellow().to_string(),
            QualitativePerformance::Fail => text.red().bold().to_string(),
        }
    }

    pub fn suggestion(&self, severity: SuggestionSeverity) -> String {
        let text = format!("[{}]", severity);
        if !self.enabled {
            return text;
        }
        match severity {
            SuggestionSeverity::Minor => text.blue().to_string(),
            SuggestionSeverity::Average => text.yellow().to_string(),
            SuggestionSeverity::Major => text.red().bold().to_string(),
        }
    }

    pub fn annotation(&self, severity: AnnotationSeverity) -> String {
        let text = severity.to_string();
        if !self.enabled {
            return text;
        }
        match severity {
            AnnotationSeverity::Minor => text.blue().to_string(),
            AnnotationSeverity::Moderate => text.yellow().to_string(),
            AnnotationSeverity::Major => text.red().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_palette_is_plain_text() {
        let palette = Palette::plain();
        assert_eq!(palette.performance(QualitativePerformance::Fail), "fail");
        assert_eq!(palette.suggestion(SuggestionSeverity::Average), "[average]");
        assert_eq!(palette.heading("active_time"), "active_time");
    }

    #[test]
    fn test_enabled_palette_adds_escapes() {
        let palette = Palette::new(true);
        let text = palette.performance(QualitativePerformance::Perfect);
        assert!(text.contains("perfect"));
        assert!(text.contains('\u{1b}'));
    }
}
