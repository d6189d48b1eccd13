use thiserror::Error;

use crate::editor::EditorMode;

/// Failures of the mutation workflow. Each user-distinguishable outcome gets
/// its own variant so callers can render a specific message; none of these
/// is fatal, retrying the action is always valid.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("not signed in; mutation actions are disabled")]
    NotAuthenticated,
    #[error("no editor is open")]
    NotOpen,
    #[error("{mode:?} mode requires an existing flight")]
    MissingFlight { mode: EditorMode },
    #[error("create mode does not take an existing flight")]
    UnexpectedFlight,
    #[error("flight has no server-assigned identity")]
    MissingFlightId,
    #[error("{field} must not be empty")]
    Validation { field: &'static str },
    #[error("failed to create gate '{gate_number}': {message}")]
    GateCreate {
        gate_number: String,
        message: String,
    },
    #[error("failed to save flight: {0}")]
    FlightWrite(String),
    #[error("failed to delete flight {id}: {message}")]
    Delete { id: i64, message: String },
}
