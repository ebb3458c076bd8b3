use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Primary verdict an analysis module attaches to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastVerdict {
    Inefficient,
    Enhanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationSeverity {
    Minor,
    Moderate,
    Major,
}

impl fmt::Display for CastVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastVerdict::Inefficient => write!(f, "inefficient"),
            CastVerdict::Enhanced => write!(f, "enhanced"),
        }
    }
}

impl fmt::Display for AnnotationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationSeverity::Minor => write!(f, "minor"),
            AnnotationSeverity::Moderate => write!(f, "moderate"),
            AnnotationSeverity::Major => write!(f, "major"),
        }
    }
}

/// Annotation slot for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub verdict: CastVerdict,
    pub severity: AnnotationSeverity,
    pub reason: String,
}

impl EventMeta {
    pub fn inefficient(severity: AnnotationSeverity, reason: impl Into<String>) -> Self {
        Self {
            verdict: CastVerdict::Inefficient,
            severity,
            reason: reason.into(),
        }
    }

    pub fn enhanced(severity: AnnotationSeverity, reason: impl Into<String>) -> Self {
        Self {
            verdict: CastVerdict::Enhanced,
            severity,
            reason: reason.into(),
        }
    }

    /// Merge `incoming` into `self`. Returns whether `incoming` was kept.
    ///
    /// Higher severity always wins. At equal severity only an annotation with the
    /// same verdict may replace the current one (it refines the reason); a
    /// contradicting verdict of equal or lower severity is dropped.
    pub fn merge(&mut self, incoming: EventMeta) -> bool {
        let replace = incoming.severity > self.severity
            || (incoming.severity == self.severity && incoming.verdict == self.verdict);
        if replace {
            *self = incoming;
        }
        replace
    }
}

/// Annotations keyed by event position in the normalized sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Annotations {
    entries: BTreeMap<usize, EventMeta>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach or merge an annotation. Returns whether it is now the event's annotation.
    pub fn annotate(&mut self, index: usize, meta: EventMeta) -> bool {
        match self.entries.get_mut(&index) {
            Some(existing) => existing.merge(meta),
            None => {
                self.entries.insert(index, meta);
                true
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&EventMeta> {
        self.entries.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &EventMeta)> {
        self.entries.iter().map(|(index, meta)| (*index, meta))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
