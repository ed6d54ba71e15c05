//! Session events

use serde::Serialize;

/// Something that happened to a form session
///
/// Collected by the engine and drained with
/// [`FormEngine::take_events`](crate::FormEngine::take_events).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    /// A field was edited
    ValueChanged {
        /// Edited field
        field: String,
        /// New value
        value: String,
        /// Fields whose default expression was re-evaluated to a new value
        derived: Vec<String>,
    },
    /// A field lost focus and was validated
    Blurred {
        /// Blurred field
        field: String,
        /// Number of messages now attached to it
        errors: usize,
    },
    /// The whole form was validated
    Validated {
        /// No field failed
        valid: bool,
        /// Number of failing fields
        failing: usize,
    },
    /// Values were restored to their initial state
    Reset,
}
