use serde::{Deserialize, Serialize};
use std::fmt;

use crate::performance::{PerformanceThresholds, QualitativePerformance, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSeverity {
    Minor,
    Average,
    Major,
}

impl fmt::Display for SuggestionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionSeverity::Minor => write!(f, "minor"),
            SuggestionSeverity::Average => write!(f, "average"),
            SuggestionSeverity::Major => write!(f, "major"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdComparison {
    /// Larger values are worse
    IsGreaterThan,
    /// Smaller values are worse
    IsLessThan,
}

/// How the actual/recommended values are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStyle {
    #[default]
    Percentage,
    Decimal,
    Number,
    Seconds,
}

impl ThresholdStyle {
    pub fn format(&self, value: f64) -> String {
        match self {
            ThresholdStyle::Percentage => rotalyze_types::format_percentage(value),
            ThresholdStyle::Decimal => format!("{value:.2}"),
            ThresholdStyle::Number => format!("{value:.0}"),
            ThresholdStyle::Seconds => format!("{:.1}s", value / 1000.0),
        }
    }
}

/// Severity boundaries as they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestionThresholds {
    pub minor: f64,
    pub average: f64,
    pub major: f64,
}

impl SuggestionThresholds {
    pub const fn new(minor: f64, average: f64, major: f64) -> Self {
        Self {
            minor,
            average,
            major,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub actual: f64,
    pub comparison: ThresholdComparison,
    pub thresholds: SuggestionThresholds,
    #[serde(default)]
    pub style: ThresholdStyle,
}

impl ThresholdSpec {
    pub fn greater_than(actual: f64, thresholds: SuggestionThresholds) -> Self {
        Self {
            actual,
            comparison: ThresholdComparison::IsGreaterThan,
            thresholds,
            style: ThresholdStyle::default(),
        }
    }

    pub fn less_than(actual: f64, thresholds: SuggestionThresholds) -> Self {
        Self {
            actual,
            comparison: ThresholdComparison::IsLessThan,
            thresholds,
            style: ThresholdStyle::default(),
        }
    }

    pub fn style(mut self, style: ThresholdStyle) -> Self {
        self.style = style;
        self
    }

    /// `None` when the value is within the minor boundary.
    pub fn severity(&self) -> Option<SuggestionSeverity> {
        let t = &self.thresholds;
        let past = |boundary: f64| match self.comparison {
            ThresholdComparison::IsGreaterThan => self.actual > boundary,
            ThresholdComparison::IsLessThan => self.actual < boundary,
        };

        if past(t.major) {
            Some(SuggestionSeverity::Major)
        } else if past(t.average) {
            Some(SuggestionSeverity::Average)
        } else if past(t.minor) {
            Some(SuggestionSeverity::Minor)
        } else {
            None
        }
    }

    pub fn recommended(&self) -> f64 {
        self.thresholds.minor
    }

    /// The same boundaries read as a qualitative tier.
    pub fn performance(&self) -> QualitativePerformance {
        let t = &self.thresholds;
        classify(
            self.actual,
            &PerformanceThresholds::new(t.minor, t.average, t.major),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub module: String,
    pub severity: SuggestionSeverity,
    pub actual: String,
    pub recommended: String,
    pub message: String,
}

impl Suggestion {
    /// Build a suggestion if the threshold is crossed.
    pub fn from_threshold(
        module: &str,
        spec: &ThresholdSpec,
        message: impl Into<String>,
    ) -> Option<Self> {
        let severity = spec.severity()?;
        let relation = match spec.comparison {
            ThresholdComparison::IsGreaterThan => "<",
            ThresholdComparison::IsLessThan => ">",
        };
        Some(Self {
            module: module.to_string(),
            severity,
            actual: spec.style.format(spec.actual),
            recommended: format!("{relation} {}", spec.style.format(spec.recommended())),
            message: message.into(),
        })
    }
}
