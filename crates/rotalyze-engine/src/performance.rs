//! Four-tier qualitative classification of numeric metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered so that `min` picks the worse tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitativePerformance {
    Fail,
    Ok,
    Good,
    Perfect,
}

impl QualitativePerformance {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualitativePerformance::Fail => "fail",
            QualitativePerformance::Ok => "ok",
            QualitativePerformance::Good => "good",
            QualitativePerformance::Perfect => "perfect",
        }
    }
}

impl fmt::Display for QualitativePerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundaries for [`classify`].
///
/// When `perfect > ok` larger values are better and a value must reach a
/// boundary to earn its tier; otherwise smaller values are better and a value
/// must not exceed the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    pub perfect: f64,
    pub good: f64,
    pub ok: f64,
}

impl PerformanceThresholds {
    pub const fn new(perfect: f64, good: f64, ok: f64) -> Self {
        Self { perfect, good, ok }
    }

    pub fn greater_is_better(&self) -> bool {
        self.perfect > self.ok
    }
}

pub fn classify(actual: f64, thresholds: &PerformanceThresholds) -> QualitativePerformance {
    let meets = |boundary: f64| {
        if thresholds.greater_is_better() {
            actual >= boundary
        } else {
            actual <= boundary
        }
    };

    if meets(thresholds.perfect) {
        QualitativePerformance::Perfect
    } else if meets(thresholds.good) {
        QualitativePerformance::Good
    } else if meets(thresholds.ok) {
        QualitativePerformance::Ok
    } else {
        QualitativePerformance::Fail
    }
}

/// Worst of the given tiers; `Perfect` for an empty input.
pub fn lowest(performances: impl IntoIterator<Item = QualitativePerformance>) -> QualitativePerformance {
    performances
        .into_iter()
        .min()
        .unwrap_or(QualitativePerformance::Perfect)
}

/// Lifts `performance` to at least `floor`.
pub fn with_floor(
    performance: QualitativePerformance,
    floor: QualitativePerformance,
) -> QualitativePerformance {
    performance.max(floor)
}

/// One named contribution to a combined verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCheck {
    pub name: String,
    pub performance: QualitativePerformance,

    /// A failing sub-check can never drag the verdict below this tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<QualitativePerformance>,
}

impl SubCheck {
    pub fn new(name: impl Into<String>, performance: QualitativePerformance) -> Self {
        Self {
            name: name.into(),
            performance,
            floor: None,
        }
    }

    pub fn floored(mut self, floor: QualitativePerformance) -> Self {
        self.floor = Some(floor);
        self
    }

    pub fn effective(&self) -> QualitativePerformance {
        match self.floor {
            Some(floor) => with_floor(self.performance, floor),
            None => self.performance,
        }
    }
}

pub fn combine(checks: &[SubCheck]) -> QualitativePerformance {
    lowest(checks.iter().map(SubCheck::effective))
}

#[cfg(test)]
mod tests {
    use super::*;
    use QualitativePerformance::*;

    const UPTIME: PerformanceThresholds = PerformanceThresholds::new(0.95, 0.85, 0.75);
    const DOWNTIME: PerformanceThresholds = PerformanceThresholds::new(0.05, 0.15, 0.25);

    #[test]
    fn test_greater_is_better() {
        assert_eq!(classify(0.96, &UPTIME), Perfect);
        assert_eq!(classify(0.95, &UPTIME), Perfect);
        assert_eq!(classify(0.9, &UPTIME), Good);
        assert_eq!(classify(0.8, &UPTIME), Ok);
        assert_eq!(classify(0.5, &UPTIME), Fail);
    }

    #[test]
    fn test_less_is_better() {
        assert_eq!(classify(0.04, &DOWNTIME), Perfect);
        assert_eq!(classify(0.1, &DOWNTIME), Good);
        assert_eq!(classify(0.25, &DOWNTIME), Ok);
        assert_eq!(classify(0.5, &DOWNTIME), Fail);
    }

    #[test]
    fn test_perfect_needs_the_perfect_boundary_when_less_is_better() {
        let thresholds = PerformanceThresholds::new(0.0, 0.2, 0.3);
        assert_eq!(classify(0.04, &thresholds), Good);
        assert_eq!(classify(0.0, &thresholds), Perfect);
    }

    #[test]
    fn test_combine_respects_floors() {
        let checks = [
            SubCheck::new("sequence", Perfect),
            SubCheck::new("debuff", Fail).floored(Good),
        ];
        assert_eq!(combine(&checks), Good);

        let checks = [
            SubCheck::new("resource", Fail),
            SubCheck::new("debuff", Fail).floored(Good),
        ];
        assert_eq!(combine(&checks), Fail);
        assert_eq!(combine(&[]), Perfect);
    }

    #[test]
    fn test_lowest_and_floor() {
        assert_eq!(lowest([Good, Ok, Perfect]), Ok);
        assert_eq!(with_floor(Fail, Ok), Ok);
        assert_eq!(with_floor(Perfect, Ok), Perfect);
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        const UPTIME: PerformanceThresholds = PerformanceThresholds::new(0.95, 0.85, 0.75);
        const DOWNTIME: PerformanceThresholds = PerformanceThresholds::new(0.05, 0.15, 0.25);

        proptest! {
            #[test]
            fn test_higher_value_never_worse_when_greater_is_better(a in 0.0f64..1.0, b in 0.0f64..1.0) {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(classify(high, &UPTIME) >= classify(low, &UPTIME));
            }

            #[test]
            fn test_lower_value_never_worse_when_less_is_better(a in 0.0f64..1.0, b in 0.0f64..1.0) {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(classify(low, &DOWNTIME) >= classify(high, &DOWNTIME));
            }
        }
    }
}
