//! Bug status and criticality constants, with the status lifecycle.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

/// Initial status of a newly filed bug.
pub const STATUS_OPEN: &str = "open";
/// A fix is available and waits for verification.
pub const STATUS_FIX_READY: &str = "fix ready";
pub const STATUS_CLOSED: &str = "closed";
/// Rejected during triage: the behaviour is expected.
pub const STATUS_CLOSED_NOT_A_DEFECT: &str = "closed not a defect";

/// All valid bug statuses.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_OPEN,
    STATUS_FIX_READY,
    STATUS_CLOSED,
    STATUS_CLOSED_NOT_A_DEFECT,
];

// ---------------------------------------------------------------------------
// Criticality
// ---------------------------------------------------------------------------

pub const CRITICALITY_BLOCKING: &str = "blocking";
pub const CRITICALITY_MAJOR: &str = "major";
pub const CRITICALITY_MINOR: &str = "minor";

pub const VALID_CRITICALITIES: &[&str] =
    &[CRITICALITY_BLOCKING, CRITICALITY_MAJOR, CRITICALITY_MINOR];

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Returns the set of statuses that `from_status` may transition to.
///
/// Transition rules:
/// - `open`                -> `fix ready`, `closed not a defect`
/// - `fix ready`           -> `closed`, `open` (fix rejected)
/// - `closed`              -> `open` (regression)
/// - `closed not a defect` -> `open`
pub fn valid_transitions(from_status: &str) -> &'static [&'static str] {
    match from_status {
        STATUS_OPEN => &[STATUS_FIX_READY, STATUS_CLOSED_NOT_A_DEFECT],
        STATUS_FIX_READY => &[STATUS_CLOSED, STATUS_OPEN],
        STATUS_CLOSED => &[STATUS_OPEN],
        STATUS_CLOSED_NOT_A_DEFECT => &[STATUS_OPEN],
        _ => &[],
    }
}

/// Validate that a status transition from `current` to `next` is allowed.
/// Keeping the current status is always allowed.
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
            "Cannot transition bug from '{current}' to '{next}'. Allowed transitions: {allowed:?}"
        )))
    }
}

pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid bug status '{status}'. Must be one of: {VALID_STATUSES:?}"
        )))
    }
}

pub fn validate_criticality(criticality: &str) -> Result<(), CoreError> {
    if VALID_CRITICALITIES.contains(&criticality) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid bug criticality '{criticality}'. Must be one of: {VALID_CRITICALITIES:?}"
        )))
    }
}

/// Parse a comma-separated status filter (`open,fix ready`).
///
/// Blank items are ignored; an empty filter yields `None` (no filtering).
pub fn parse_status_filter(raw: &str) -> Result<Option<Vec<String>>, CoreError> {
    let statuses = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| validate_status(s).map(|()| s.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((!statuses.is_empty()).then_some(statuses))
}
