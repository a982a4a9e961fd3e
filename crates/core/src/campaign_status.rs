//! Campaign statuses and the default status of a scenario linked into a
//! campaign.
//!
//! Scenario execution statuses inside a campaign are caller-defined free
//! text (e.g. `"waiting fix"`); only their shape is checked here.

use crate::error::CoreError;

pub const STATUS_RECORDED: &str = "recorded";
pub const STATUS_IN_PROGRESS: &str = "in progress";
pub const STATUS_PAUSED: &str = "paused";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_DONE: &str = "done";
pub const STATUS_CLOSED: &str = "closed";

/// All valid campaign statuses.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_RECORDED,
    STATUS_IN_PROGRESS,
    STATUS_PAUSED,
    STATUS_CANCELLED,
    STATUS_DONE,
    STATUS_CLOSED,
];

/// Status given to a scenario when it is first attached to a campaign ticket.
pub const SCENARIO_STATUS_DEFAULT: &str = "recorded";

/// Maximum length of a scenario execution status.
pub const MAX_SCENARIO_STATUS_LENGTH: usize = 64;

/// Validate that a campaign status string is one of the known statuses.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid campaign status '{status}'. Must be one of: {VALID_STATUSES:?}"
        )))
    }
}

/// Normalise a scenario execution status: surrounding whitespace is removed
/// and the result must be non-empty.
pub fn normalize_scenario_status(status: &str) -> Result<String, CoreError> {
    let trimmed = status.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Scenario status must not be empty".into(),
        ));
    }
    if trimmed.chars().count() > MAX_SCENARIO_STATUS_LENGTH {
        return Err(CoreError::Validation(format!(
            "Scenario status exceeds maximum length of {MAX_SCENARIO_STATUS_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}
