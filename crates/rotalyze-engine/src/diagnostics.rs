//! Data-quality notes and module debug output.
//!
//! Every note is recorded in the run's report; the injected [`DiagnosticSink`]
//! decides where it is echoed. The engine never writes to stdout/stderr itself.

use rotalyze_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// A resource would have gone negative and was clamped to zero
    ClampedResource,
    /// A recorded waste value disagreed with the computed one
    WasteMismatch,
    /// Refresh or removal of an effect that was not active, or apply over an active one
    UnexpectedAuraTransition,
    /// A window was still open when the session ended
    DiscardedWindow,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::ClampedResource => "clamped_resource",
            NoteKind::WasteMismatch => "waste_mismatch",
            NoteKind::UnexpectedAuraTransition => "unexpected_aura_transition",
            NoteKind::DiscardedWindow => "discarded_window",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityNote {
    pub module: String,
    pub kind: NoteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    pub message: String,
}

/// Destination for notes and debug output.
pub trait DiagnosticSink {
    fn note(&self, note: &DataQualityNote);

    fn debug(&self, module: &str, message: &str);
}

/// Forwards everything to `tracing`.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn note(&self, note: &DataQualityNote) {
        tracing::warn!(
            module = %note.module,
            kind = ?note.kind,
            timestamp = ?note.timestamp,
            "{}",
            note.message
        );
    }

    fn debug(&self, module: &str, message: &str) {
        tracing::debug!(module, "{}", message);
    }
}

pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn note(&self, _note: &DataQualityNote) {}

    fn debug(&self, _module: &str, _message: &str) {}
}

/// Keeps everything in memory, for tests.
#[derive(Default)]
pub struct CollectingSink {
    notes: RefCell<Vec<DataQualityNote>>,
    debug: RefCell<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<DataQualityNote> {
        self.notes.borrow().clone()
    }

    pub fn debug_lines(&self) -> Vec<String> {
        self.debug.borrow().clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn note(&self, note: &DataQualityNote) {
        self.notes.borrow_mut().push(note.clone());
    }

    fn debug(&self, module: &str, message: &str) {
        self.debug.borrow_mut().push(format!("{module}: {message}"));
    }
}

struct Shared {
    sink: Rc<dyn DiagnosticSink>,
    debug_enabled: bool,
    notes: RefCell<Vec<DataQualityNote>>,
}

/// Cheap handle to the run's diagnostics, scoped to one module.
#[derive(Clone)]
pub struct Diagnostics {
    shared: Rc<Shared>,
    module: &'static str,
}

impl Diagnostics {
    pub fn new(sink: Rc<dyn DiagnosticSink>, debug_enabled: bool) -> Self {
        Self {
            shared: Rc::new(Shared {
                sink,
                debug_enabled,
                notes: RefCell::new(Vec::new()),
            }),
            module: "engine",
        }
    }

    /// Handle that records nothing anywhere but its own note list.
    pub fn detached() -> Self {
        Self::new(Rc::new(NullSink), false)
    }

    pub fn for_module(&self, module: &'static str) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            module,
        }
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn note(&self, kind: NoteKind, timestamp: Option<Timestamp>, message: impl Into<String>) {
        let note = DataQualityNote {
            module: self.module.to_string(),
            kind,
            timestamp,
            message: message.into(),
        };
        self.shared.sink.note(&note);
        self.shared.notes.borrow_mut().push(note);
    }

    /// Debug output is built lazily and only when enabled.
    pub fn debug(&self, message: impl FnOnce() -> String) {
        if self.shared.debug_enabled {
            self.shared.sink.debug(self.module, &message());
        }
    }

    pub fn notes(&self) -> Vec<DataQualityNote> {
        self.shared.notes.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_reach_sink_and_report() {
        let sink = Rc::new(CollectingSink::new());
        let diagnostics = Diagnostics::new(sink.clone(), false);
        let scoped = diagnostics.for_module("resources");

        scoped.note(NoteKind::ClampedResource, Some(1500), "clamped");

        assert_eq!(sink.notes().len(), 1);
        assert_eq!(diagnostics.notes()[0].module, "resources");
    }

    #[test]
    fn test_debug_is_disableable() {
        let sink = Rc::new(CollectingSink::new());
        let quiet = Diagnostics::new(sink.clone(), false);
        quiet.debug(|| "hidden".to_string());
        assert!(sink.debug_lines().is_empty());

        let loud = Diagnostics::new(sink.clone(), true).for_module("buffs");
        loud.debug(|| "shown".to_string());
        assert_eq!(sink.debug_lines(), vec!["buffs: shown".to_string()]);
    }
}
