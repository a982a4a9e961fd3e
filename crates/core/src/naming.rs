//! Validation of the natural keys that appear in URL paths.
//!
//! Project names, version labels and ticket references are all used as
//! path segments (`/projects/{name}/versions/{version}/tickets/{reference}`),
//! so each is bounded in length and may not contain a path separator.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum length (in characters) of a project name.
pub const MAX_PROJECT_NAME_LENGTH: usize = 50;
/// Maximum length (in characters) of a version label.
pub const MAX_VERSION_LENGTH: usize = 50;
/// Maximum length (in characters) of a ticket reference.
pub const MAX_TICKET_REFERENCE_LENGTH: usize = 50;

/// Characters that are never accepted in a project name.
pub const FORBIDDEN_PROJECT_CHARS: &[char] = &['/', '\\', '$', '*'];

/// A project name starts with a letter or digit and continues with letters,
/// digits, spaces, `_`, `.` or `-`.
static PROJECT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} _.\-]*$").expect("valid regex")
});

/// Validate a project name and return its canonical (casefolded) form.
///
/// Project names are case-insensitive: `Alpha` and `alpha` are the same
/// project, and the lowercase form is what gets stored.
///
/// ```
/// use qadash_core::naming::validate_project_name;
///
/// assert_eq!(validate_project_name("Payments API").unwrap(), "payments api");
/// assert!(validate_project_name("a/b").is_err());
/// ```
pub fn validate_project_name(name: &str) -> Result<String, CoreError> {
    let length = name.chars().count();
    if length == 0 {
        return Err(CoreError::Validation(
            "Project name must not be empty".into(),
        ));
    }
    if length > MAX_PROJECT_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Project name exceeds maximum length of {MAX_PROJECT_NAME_LENGTH} characters (got {length})"
        )));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_PROJECT_CHARS.contains(c)) {
        return Err(CoreError::Validation(format!(
            "Project name must not contain '{ch}'"
        )));
    }

    let canonical = canonical_project_name(name);
    if !PROJECT_NAME_RE.is_match(&canonical) {
        return Err(CoreError::Validation(format!(
            "Project name '{name}' must start with a letter or digit and contain only \
             letters, digits, spaces, '_', '.' or '-'"
        )));
    }
    Ok(canonical)
}

/// Canonical lookup form of a project name. No validation is performed.
pub fn canonical_project_name(name: &str) -> String {
    name.to_lowercase()
}

/// Validate a version label (free-form, but usable as a path segment).
pub fn validate_version_label(version: &str) -> Result<(), CoreError> {
    validate_path_key("Version", version, MAX_VERSION_LENGTH)
}

/// Validate a ticket reference (free-form, but usable as a path segment).
pub fn validate_ticket_reference(reference: &str) -> Result<(), CoreError> {
    validate_path_key("Ticket reference", reference, MAX_TICKET_REFERENCE_LENGTH)
}

fn validate_path_key(label: &str, value: &str, max_length: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{label} must not be empty")));
    }
    if value.trim() != value {
        return Err(CoreError::Validation(format!(
            "{label} must not start or end with whitespace"
        )));
    }
    let length = value.chars().count();
    if length > max_length {
        return Err(CoreError::Validation(format!(
            "{label} exceeds maximum length of {max_length} characters (got {length})"
        )));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(CoreError::Validation(format!(
            "{label} must not contain a path separator"
        )));
    }
    Ok(())
}
