//! Ticket status constants and transition rules.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

/// Initial status for a newly recorded ticket.
pub const STATUS_OPEN: &str = "open";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
/// Progress is blocked (typically waiting on a bug fix).
pub const STATUS_BLOCKED: &str = "blocked";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_DONE: &str = "done";

/// All valid ticket statuses.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_OPEN,
    STATUS_IN_PROGRESS,
    STATUS_BLOCKED,
    STATUS_CANCELLED,
    STATUS_DONE,
];

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Returns the set of statuses that `from_status` may transition to.
///
/// Transition rules:
/// - `open`        -> `in_progress`, `cancelled`
/// - `in_progress` -> `blocked`, `done`, `cancelled`
/// - `blocked`     -> `in_progress`, `cancelled`
/// - `cancelled`   -> `open`, `in_progress` (re-open)
/// - `done`        -> (terminal)
pub fn valid_transitions(from_status: &str) -> &'static [&'static str] {
    match from_status {
        STATUS_OPEN => &[STATUS_IN_PROGRESS, STATUS_CANCELLED],
        STATUS_IN_PROGRESS => &[STATUS_BLOCKED, STATUS_DONE, STATUS_CANCELLED],
        STATUS_BLOCKED => &[STATUS_IN_PROGRESS, STATUS_CANCELLED],
        STATUS_CANCELLED => &[STATUS_OPEN, STATUS_IN_PROGRESS],
        _ => &[],
    }
}

/// Validate that a status transition from `current` to `next` is allowed.
pub fn validate_transition(current: &str, next: &str) -> Result<(), CoreError> {
    validate_status(next)?;
    if current == next {
        return Ok(());
    }
    let allowed = valid_transitions(current);
    if allowed.contains(&next) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot transition ticket from '{current}' to '{next}'. Allowed transitions: {allowed:?}"
        )))
    }
}

/// Validate that a status string is one of the known statuses.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid ticket status '{status}'. Must be one of: {VALID_STATUSES:?}"
        )))
    }
}
