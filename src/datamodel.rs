//! Parser for the textual data-model format.
//!
//! The format is line-oriented. An entry starts at column zero as
//! `key: value`; lines that do not start a new entry continue the previous
//! value, so multi-line JSON objects and arrays work naturally:
//!
//! ```text
//! name: "World"
//! answer: 42
//! launched: 2024-03-01 09:30:00
//! tags: ["a",
//!        "b"]
//! ```
//!
//! Values are interpreted as JSON when they parse as JSON, as date-times
//! when chrono recognizes them, and as plain text otherwise. This syntax
//! belongs to this service, not to the template engine.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A single value bound into template evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Unquoted free-form text.
    Text(String),
    /// Anything that parsed as JSON: strings, numbers, booleans, null,
    /// arrays, objects.
    Json(serde_json::Value),
    /// A date-time; naive inputs are anchored in the parser's default zone.
    DateTime(DateTime<FixedOffset>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataModelParseError {
    #[error("line {line}: expected an entry like `key: value`, found {snippet:?}")]
    MalformedEntry { line: usize, snippet: String },
    #[error("line {line}: duplicate key {key:?}")]
    DuplicateKey { line: usize, key: String },
    #[error("line {line}: key {key:?} has an empty value")]
    EmptyValue { line: usize, key: String },
    #[error("line {line}: {value:?} looks like a date-time but could not be read as one")]
    AmbiguousDateTime { line: usize, value: String },
}

static ENTRY_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)[ \t]*:(.*)$").expect("entry pattern compiles")
});

// Lines whose value begins like a date are sent to the chrono path even if
// the full parse later fails, so typos surface as errors instead of being
// silently bound as text.
static DATE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}([T ].*)?$").expect("date pattern compiles"));

/// Parses the data-model text into an ordered key-value mapping. Naive
/// date-times are interpreted in `default_tz`.
pub fn parse(
    text: &str,
    default_tz: FixedOffset,
) -> Result<IndexMap<String, DataValue>, DataModelParseError> {
    let mut entries: Vec<(String, String, usize)> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(caps) = ENTRY_START.captures(line) {
            let key = caps[1].to_string();
            let value = caps[2].to_string();
            entries.push((key, value, line_no));
        } else if let Some((_, value, _)) = entries.last_mut() {
            value.push('\n');
            value.push_str(line);
        } else if !line.trim().is_empty() {
            return Err(DataModelParseError::MalformedEntry {
                line: line_no,
                snippet: line.trim().to_string(),
            });
        }
    }

    let mut model = IndexMap::with_capacity(entries.len());
    for (key, raw_value, line) in entries {
        if model.contains_key(&key) {
            return Err(DataModelParseError::DuplicateKey { line, key });
        }
        let value = interpret_value(raw_value.trim(), default_tz, &key, line)?;
        model.insert(key, value);
    }
    Ok(model)
}

fn interpret_value(
    raw: &str,
    default_tz: FixedOffset,
    key: &str,
    line: usize,
) -> Result<DataValue, DataModelParseError> {
    if raw.is_empty() {
        return Err(DataModelParseError::EmptyValue {
            line,
            key: key.to_string(),
        });
    }
    if DATE_LIKE.is_match(raw) {
        return parse_date_time(raw, default_tz)
            .map(DataValue::DateTime)
            .ok_or_else(|| DataModelParseError::AmbiguousDateTime {
                line,
                value: raw.to_string(),
            });
    }
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) {
        return Ok(DataValue::Json(json));
    }
    Ok(DataValue::Text(raw.to_string()))
}

fn parse_date_time(raw: &str, default_tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return naive.and_local_timezone(default_tz).single();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| naive.and_local_timezone(default_tz).single());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Timelike;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn parses_json_scalars() {
        let model = parse("name: \"World\"\nanswer: 42\nactive: true", utc()).unwrap();
        assert_eq!(
            model["name"],
            DataValue::Json(serde_json::json!("World"))
        );
        assert_eq!(model["answer"], DataValue::Json(serde_json::json!(42)));
        assert_eq!(model["active"], DataValue::Json(serde_json::json!(true)));
    }

    #[test]
    fn unquoted_text_stays_text() {
        let model = parse("greeting: Hello there", utc()).unwrap();
        assert_eq!(model["greeting"], DataValue::Text("Hello there".into()));
    }

    #[test]
    fn preserves_entry_order() {
        let model = parse("b: 1\na: 2\nc: 3", utc()).unwrap();
        let keys: Vec<_> = model.keys().cloned().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn continuation_lines_join_multiline_values() {
        let model = parse("tags: [\"a\",\n  \"b\"]", utc()).unwrap();
        assert_eq!(
            model["tags"],
            DataValue::Json(serde_json::json!(["a", "b"]))
        );
    }

    #[test]
    fn naive_date_time_uses_the_default_zone() {
        let berlin = FixedOffset::east_opt(3600).unwrap();
        let model = parse("at: 2024-03-01 09:30:00", berlin).unwrap();
        let DataValue::DateTime(dt) = &model["at"] else {
            panic!("expected a date-time value");
        };
        assert_eq!(dt.offset().local_minus_utc(), 3600);
        assert_eq!(dt.hour(), 9);
    }

    #[test]
    fn rfc3339_keeps_its_own_offset() {
        let model = parse("at: 2024-03-01T09:30:00+02:00", utc()).unwrap();
        let DataValue::DateTime(dt) = &model["at"] else {
            panic!("expected a date-time value");
        };
        assert_eq!(dt.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn bare_dates_become_midnight() {
        let model = parse("day: 2024-03-01", utc()).unwrap();
        assert_matches!(model["day"], DataValue::DateTime(dt) if dt.hour() == 0);
    }

    #[test]
    fn date_like_garbage_is_an_error() {
        let err = parse("at: 2024-13-45 99:00:00", utc()).unwrap_err();
        assert_matches!(err, DataModelParseError::AmbiguousDateTime { line: 1, .. });
    }

    #[test]
    fn leading_junk_is_malformed() {
        let err = parse("just some prose", utc()).unwrap_err();
        assert_matches!(err, DataModelParseError::MalformedEntry { line: 1, .. });
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = parse("a: 1\na: 2", utc()).unwrap_err();
        assert_eq!(
            err,
            DataModelParseError::DuplicateKey {
                line: 2,
                key: "a".into()
            }
        );
    }

    #[test]
    fn empty_values_are_rejected() {
        let err = parse("a:", utc()).unwrap_err();
        assert_matches!(err, DataModelParseError::EmptyValue { line: 1, .. });
    }

    #[test]
    fn blank_input_parses_to_an_empty_model() {
        assert!(parse("", utc()).unwrap().is_empty());
        assert!(parse("\n  \n", utc()).unwrap().is_empty());
    }

    #[test]
    fn non_entry_lines_continue_the_previous_value() {
        let model = parse("para: first\nand second", utc()).unwrap();
        assert_eq!(model["para"], DataValue::Text("first\nand second".into()));
    }

    #[test]
    fn messages_name_the_offending_line() {
        let err = parse("a: 1\na: 2", utc()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
