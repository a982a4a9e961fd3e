//! Version lifecycle statuses, transition rules, and bucket derivation.
//!
//! A version moves from `recorded` through test planning, campaign
//! execution and test-execution-report (TER) writing until it is archived.
//! The bucket a version is listed under (future / current / archived) is
//! derived from its status and never stored.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_RECORDED: &str = "recorded";
pub const STATUS_TEST_PLAN_WRITING: &str = "test plan writing";
pub const STATUS_TEST_PLAN_SENT: &str = "test plan sent";
pub const STATUS_TEST_PLAN_ACCEPTED: &str = "test plan accepted";
pub const STATUS_CAMPAIGN_STARTED: &str = "campaign started";
pub const STATUS_CAMPAIGN_ENDED: &str = "campaign ended";
pub const STATUS_TER_WRITING: &str = "ter writing";
pub const STATUS_TER_SENT: &str = "ter sent";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_ARCHIVED: &str = "archived";

/// All valid version statuses, in lifecycle order.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_RECORDED,
    STATUS_TEST_PLAN_WRITING,
    STATUS_TEST_PLAN_SENT,
    STATUS_TEST_PLAN_ACCEPTED,
    STATUS_CAMPAIGN_STARTED,
    STATUS_CAMPAIGN_ENDED,
    STATUS_TER_WRITING,
    STATUS_TER_SENT,
    STATUS_CANCELLED,
    STATUS_ARCHIVED,
];

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Returns the set of statuses that `from_status` may transition to.
///
/// Every non-terminal status may be cancelled. A cancelled version can be
/// revived into any other status; an archived one cannot move.
pub fn valid_transitions(from_status: &str) -> &'static [&'static str] {
    match from_status {
        STATUS_RECORDED => &[STATUS_TEST_PLAN_WRITING, STATUS_CANCELLED],
        STATUS_TEST_PLAN_WRITING => &[STATUS_TEST_PLAN_SENT, STATUS_CANCELLED],
        STATUS_TEST_PLAN_SENT => &[
            STATUS_TEST_PLAN_ACCEPTED,
            STATUS_CAMPAIGN_STARTED,
            STATUS_CANCELLED,
        ],
        STATUS_TEST_PLAN_ACCEPTED => &[STATUS_CAMPAIGN_STARTED, STATUS_CANCELLED],
        STATUS_CAMPAIGN_STARTED => &[STATUS_CAMPAIGN_ENDED, STATUS_CANCELLED],
        STATUS_CAMPAIGN_ENDED => &[STATUS_TER_WRITING, STATUS_CANCELLED],
        STATUS_TER_WRITING => &[STATUS_TER_SENT, STATUS_CANCELLED],
        STATUS_TER_SENT => &[STATUS_ARCHIVED],
        STATUS_CANCELLED => &[
            STATUS_RECORDED,
            STATUS_TEST_PLAN_WRITING,
            STATUS_TEST_PLAN_SENT,
            STATUS_TEST_PLAN_ACCEPTED,
            STATUS_CAMPAIGN_STARTED,
            STATUS_CAMPAIGN_ENDED,
            STATUS_TER_WRITING,
            STATUS_TER_SENT,
            STATUS_ARCHIVED,
        ],
        _ => &[],
    }
}

/// Validate that a status transition from `current` to `next` is allowed.
///
/// Re-asserting the current status is accepted as a no-op.
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
            "Cannot transition version from '{current}' to '{next}'. Allowed transitions: {allowed:?}"
        )))
    }
}

/// Validate that a status string is one of the known statuses.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid version status '{status}'. Must be one of: {VALID_STATUSES:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// The listing group a version falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBucket {
    Future,
    Current,
    Archived,
}

impl VersionBucket {
    /// All buckets in display order.
    pub const ALL: [VersionBucket; 3] = [
        VersionBucket::Current,
        VersionBucket::Future,
        VersionBucket::Archived,
    ];

    /// Derive the bucket from a version status.
    ///
    /// - `recorded` -> future (work has not started)
    /// - `archived` -> archived
    /// - anything else -> current
    pub fn for_status(status: &str) -> Self {
        match status {
            STATUS_RECORDED => VersionBucket::Future,
            STATUS_ARCHIVED => VersionBucket::Archived,
            _ => VersionBucket::Current,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersionBucket::Future => "future",
            VersionBucket::Current => "current",
            VersionBucket::Archived => "archived",
        }
    }

    /// Parse a bucket name (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_lowercase().as_str() {
            "future" => Ok(VersionBucket::Future),
            "current" => Ok(VersionBucket::Current),
            "archived" => Ok(VersionBucket::Archived),
            other => Err(CoreError::Validation(format!(
                "Unknown section '{other}'. Must be one of: current, future, archived"
            ))),
        }
    }
}

/// Parse a comma-separated `sections` query value into buckets.
///
/// `None` or an empty string selects every bucket. Duplicates are collapsed
/// while preserving first-seen order.
pub fn parse_sections(sections: Option<&str>) -> Result<Vec<VersionBucket>, CoreError> {
    let Some(raw) = sections.filter(|s| !s.trim().is_empty()) else {
        return Ok(VersionBucket::ALL.to_vec());
    };
    let mut buckets = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let bucket = VersionBucket::parse(part)?;
        if !buckets.contains(&bucket) {
            buckets.push(bucket);
        }
    }
    Ok(buckets)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_statuses_are_valid() {
        for s in VALID_STATUSES {
            assert!(validate_status(s).is_ok(), "Status '{s}' should be valid");
        }
    }

    #[test]
    fn unknown_status_is_invalid() {
        assert!(validate_status("released").is_err());
        assert!(validate_status("").is_err());
    }

    #[test]
    fn happy_path_walks_to_archived() {
        let path = [
            STATUS_RECORDED,
            STATUS_TEST_PLAN_WRITING,
            STATUS_TEST_PLAN_SENT,
            STATUS_TEST_PLAN_ACCEPTED,
            STATUS_CAMPAIGN_STARTED,
            STATUS_CAMPAIGN_ENDED,
            STATUS_TER_WRITING,
            STATUS_TER_SENT,
            STATUS_ARCHIVED,
        ];
        for pair in path.windows(2) {
            assert!(
                validate_transition(pair[0], pair[1]).is_ok(),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_plan_sent_may_skip_acceptance() {
        assert!(validate_transition(STATUS_TEST_PLAN_SENT, STATUS_CAMPAIGN_STARTED).is_ok());
    }

    #[test]
    fn cannot_skip_ahead_or_go_back() {
        assert!(validate_transition(STATUS_RECORDED, STATUS_CAMPAIGN_STARTED).is_err());
        assert!(validate_transition(STATUS_CAMPAIGN_ENDED, STATUS_CAMPAIGN_STARTED).is_err());
        assert!(validate_transition(STATUS_TER_SENT, STATUS_CANCELLED).is_err());
    }

    #[test]
    fn archived_is_terminal() {
        assert!(valid_transitions(STATUS_ARCHIVED).is_empty());
        assert!(validate_transition(STATUS_ARCHIVED, STATUS_RECORDED).is_err());
    }

    #[test]
    fn cancelled_can_be_revived_anywhere() {
        for s in VALID_STATUSES {
            assert!(validate_transition(STATUS_CANCELLED, s).is_ok());
        }
    }

    #[test]
    fn same_status_is_a_no_op() {
        assert!(validate_transition(STATUS_CAMPAIGN_STARTED, STATUS_CAMPAIGN_STARTED).is_ok());
    }

    #[test]
    fn buckets_follow_status() {
        assert_eq!(VersionBucket::for_status(STATUS_RECORDED), VersionBucket::Future);
        assert_eq!(VersionBucket::for_status(STATUS_ARCHIVED), VersionBucket::Archived);
        assert_eq!(VersionBucket::for_status(STATUS_CANCELLED), VersionBucket::Current);
        assert_eq!(VersionBucket::for_status(STATUS_TER_WRITING), VersionBucket::Current);
    }

    #[test]
    fn sections_default_to_all_buckets() {
        assert_eq!(parse_sections(None).unwrap(), VersionBucket::ALL.to_vec());
        assert_eq!(parse_sections(Some("")).unwrap(), VersionBucket::ALL.to_vec());
    }

    #[test]
    fn sections_are_parsed_and_deduplicated() {
        let buckets = parse_sections(Some("Archived, future,archived")).unwrap();
        assert_eq!(buckets, vec![VersionBucket::Archived, VersionBucket::Future]);
        assert!(parse_sections(Some("current,past")).is_err());
    }
}
