//! Parsing of the scenario-repository CSV export.
//!
//! The export has one row per scenario and repeats the epic and feature
//! columns on every row. Quoted fields may span several lines (scenario
//! steps usually do). A file is accepted or rejected as a whole: the first
//! malformed row aborts the parse so nothing is imported.

use crate::error::CoreError;

/// Columns every repository export must carry, in canonical order.
pub const REQUIRED_HEADERS: &[&str] = &[
    "epic",
    "feature_filename",
    "feature_name",
    "feature_tags",
    "feature_description",
    "scenario_id",
    "scenario_name",
    "scenario_tags",
    "scenario_description",
    "scenario_is_outline",
    "scenario_steps",
];

/// One parsed scenario row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRow {
    pub epic: String,
    pub feature_filename: String,
    pub feature_name: String,
    pub feature_tags: String,
    pub feature_description: String,
    pub scenario_id: String,
    pub scenario_name: String,
    pub scenario_tags: String,
    pub scenario_description: String,
    pub scenario_is_outline: bool,
    pub scenario_steps: String,
}

/// Parse a repository export.
///
/// Headers may appear in any order but must be exactly [`REQUIRED_HEADERS`].
/// Blank lines between records are skipped. Errors name the 1-based line on
/// which the offending record starts.
pub fn parse_repository_csv(data: &[u8]) -> Result<Vec<RepositoryRow>, CoreError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| CoreError::Validation(format!("Repository file is not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = split_records(text)?.into_iter();
    let (_, header) = records
        .next()
        .ok_or_else(|| CoreError::Validation("Repository file is empty".into()))?;
    let positions = header_positions(&header)?;

    let mut rows = Vec::new();
    for (line, fields) in records {
        if fields.len() != header.len() {
            return Err(CoreError::Validation(format!(
                "Line {line}: expected {} fields, found {}",
                header.len(),
                fields.len()
            )));
        }
        rows.push(build_row(line, &fields, &positions)?);
    }
    Ok(rows)
}

/// Map each required header to its column index.
fn header_positions(header: &[String]) -> Result<[usize; 11], CoreError> {
    let names: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

    if let Some(unknown) = names
        .iter()
        .find(|n| !REQUIRED_HEADERS.contains(&n.as_str()))
    {
        return Err(CoreError::Validation(format!(
            "Unknown repository column '{unknown}'"
        )));
    }

    let mut positions = [0usize; 11];
    let mut missing = Vec::new();
    for (slot, required) in REQUIRED_HEADERS.iter().enumerate() {
        match names.iter().position(|n| n == required) {
            Some(index) => positions[slot] = index,
            None => missing.push(*required),
        }
    }
    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "Repository file is missing columns: {}",
            missing.join(", ")
        )));
    }
    Ok(positions)
}

fn build_row(line: usize, fields: &[String], positions: &[usize; 11]) -> Result<RepositoryRow, CoreError> {
    let get = |slot: usize| fields[positions[slot]].clone();

    let row = RepositoryRow {
        epic: get(0).trim().to_string(),
        feature_filename: get(1).trim().to_string(),
        feature_name: get(2).trim().to_string(),
        feature_tags: get(3),
        feature_description: get(4),
        scenario_id: get(5).trim().to_string(),
        scenario_name: get(6),
        scenario_tags: get(7),
        scenario_description: get(8),
        scenario_is_outline: parse_bool(line, &get(9))?,
        scenario_steps: get(10),
    };

    for (column, value) in [
        ("epic", &row.epic),
        ("feature_name", &row.feature_name),
        ("scenario_id", &row.scenario_id),
    ] {
        if value.is_empty() {
            return Err(CoreError::Validation(format!(
                "Line {line}: column '{column}' must not be empty"
            )));
        }
    }
    Ok(row)
}

/// Trim a repository key (`epic`, `feature_name`, `scenario_id`) and reject
/// it when nothing is left.
pub fn normalize_key(column: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!(
            "'{column}' must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_bool(line: usize, value: &str) -> Result<bool, CoreError> {
    match value.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(CoreError::Validation(format!(
            "Line {line}: scenario_is_outline must be a boolean, got '{other}'"
        ))),
    }
}

/// Split a document into records of fields, tracking the line on which each
/// record starts.
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, CoreError> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_start = 1;
    let mut record_has_content = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    // Escaped quote.
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    current.push('\n');
                }
                '\r' if chars.peek() == Some(&'\n') => {}
                _ => current.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                record_has_content = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut current));
                record_has_content = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                if record_has_content || !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                    records.push((record_start, std::mem::take(&mut fields)));
                }
                record_has_content = false;
                line += 1;
                record_start = line;
            }
            _ => {
                current.push(ch);
                record_has_content = true;
            }
        }
    }

    if in_quotes {
        return Err(CoreError::Validation(format!(
            "Line {record_start}: unterminated quoted field"
        )));
    }
    if record_has_content || !current.is_empty() {
        fields.push(current);
        records.push((record_start, fields));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const HEADER: &str = "epic,feature_filename,feature_name,feature_tags,feature_description,\
scenario_id,scenario_name,scenario_tags,scenario_description,scenario_is_outline,scenario_steps";

    #[test]
    fn parses_rows_with_multiline_steps() {
        let csv = format!(
            "{HEADER}\n\
             Payments,pay.feature,Card payment,@smoke,Pay by card,PAY-1,Valid card,@fast,,false,\"Given a card\nWhen I pay\nThen it \"\"works\"\"\"\n\
             Payments,pay.feature,Card payment,@smoke,Pay by card,PAY-2,Expired card,,,TRUE,Given an expired card\n"
        );
        let rows = parse_repository_csv(csv.as_bytes()).expect("parse should succeed");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].epic, "Payments");
        assert_eq!(rows[0].scenario_id, "PAY-1");
        assert_eq!(
            rows[0].scenario_steps,
            "Given a card\nWhen I pay\nThen it \"works\""
        );
        assert!(!rows[0].scenario_is_outline);
        assert!(rows[1].scenario_is_outline);
    }

    #[test]
    fn headers_may_be_reordered() {
        let csv = "scenario_id,epic,feature_name,feature_filename,feature_tags,feature_description,\
scenario_name,scenario_tags,scenario_description,scenario_is_outline,scenario_steps\r\n\
S-1,Epic,Feature,f.feature,,,Name,,,0,steps\r\n";
        let rows = parse_repository_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].scenario_id, "S-1");
        assert_eq!(rows[0].epic, "Epic");
        assert_eq!(rows[0].feature_filename, "f.feature");
    }

    #[test]
    fn missing_header_rejects_file() {
        let csv = "epic,feature_name,scenario_id\nE,F,S\n";
        let err = parse_repository_csv(csv.as_bytes()).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("missing columns"));
    }

    #[test]
    fn unknown_header_rejects_file() {
        let csv = format!("{HEADER},extra\n");
        assert_matches!(
            parse_repository_csv(csv.as_bytes()),
            Err(CoreError::Validation(msg)) if msg.contains("extra")
        );
    }

    #[test]
    fn short_row_reports_its_line() {
        let csv = format!("{HEADER}\n\nE,f,F,,,S-1,N,,,false,steps\nE,f,F\n");
        let err = parse_repository_csv(csv.as_bytes()).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.starts_with("Line 4:"));
    }

    #[test]
    fn empty_key_column_is_rejected() {
        let csv = format!("{HEADER}\nE,f,F,,,,N,,,false,steps\n");
        assert_matches!(
            parse_repository_csv(csv.as_bytes()),
            Err(CoreError::Validation(msg)) if msg.contains("scenario_id")
        );
    }

    #[test]
    fn keys_are_trimmed_and_must_not_be_blank() {
        assert_eq!(normalize_key("epic", "  Accounts ").unwrap(), "Accounts");
        assert_matches!(
            normalize_key("scenario_id", " \t "),
            Err(CoreError::Validation(msg)) if msg.contains("scenario_id")
        );
    }

    #[test]
    fn bad_boolean_is_rejected() {
        let csv = format!("{HEADER}\nE,f,F,,,S-1,N,,,maybe,steps\n");
        assert!(parse_repository_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let csv = format!("{HEADER}\nE,f,F,,,S-1,N,,,false,\"never closed\n");
        assert!(parse_repository_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(parse_repository_csv(b"").is_err());
    }
}
