//! Trade payload validation.
//!
//! Turns raw JSON into `NewTrade` / `TradePatch`. Every field is checked
//! in a single pass and all problems are reported together, keyed by the
//! wire field name. Unknown keys are rejected (strict mode).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::trade::{
    ClosedSet, NewTrade, Pair, Session, TimeframeBlock, TimeframeEntry, TradePatch, TradeResult,
    TradeType, Trend,
};

/// Default maximum length of `notes`, in characters.
pub const DEFAULT_NOTES_MAX_CHARS: usize = 2000;

/// Every key a trade payload may carry.
const KNOWN_FIELDS: &[&str] = &[
    "date",
    "session",
    "pair",
    "trendMain",
    "trendSecondary",
    "tfBlock",
    "tfEntry",
    "tradeType",
    "rr",
    "result",
    "notes",
    "screenshotUrl",
    "screenshotId",
];

static RR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(\.\d+)?(:\d+(\.\d+)?)?$").expect("rr pattern is valid")
});

static PUBLIC_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-/]+$").expect("public id pattern is valid"));

/// Tunable validation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    /// Maximum `notes` length after trimming.
    pub notes_max_chars: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            notes_max_chars: DEFAULT_NOTES_MAX_CHARS,
        }
    }
}

/// Rejected payload, with messages keyed by field.
///
/// Serializes as `{ "formErrors": [...], "fieldErrors": { field: [...] } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("invalid trade payload: {}", self.summary())]
pub struct ValidationError {
    /// Problems not attributable to a single field.
    pub form_errors: Vec<String>,
    /// Per-field messages.
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// A form-level error.
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_errors: vec![message.into()],
            field_errors: BTreeMap::new(),
        }
    }

    /// Record a message against `field`.
    pub fn push_field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Messages for a single field.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.field_errors.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    fn summary(&self) -> String {
        let fields = self
            .field_errors
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")));
        self.form_errors
            .iter()
            .cloned()
            .chain(fields)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validate a create payload.
///
/// All required fields must be present; optional fields may be omitted
/// but not `null`.
pub fn validate_create(
    input: &Value,
    rules: &ValidationRules,
) -> Result<NewTrade, ValidationError> {
    let fields = as_object(input)?;
    let mut errors = ValidationError::default();
    reject_unknown_keys(fields, &mut errors);

    let date = required(fields, "date", &mut errors, parse_date);
    let session = required(fields, "session", &mut errors, parse_literal::<Session>);
    let pair = required(fields, "pair", &mut errors, parse_literal::<Pair>);
    let trend_main = required(fields, "trendMain", &mut errors, parse_literal::<Trend>);
    let trend_secondary = required(fields, "trendSecondary", &mut errors, parse_literal::<Trend>);
    let tf_block = required(fields, "tfBlock", &mut errors, parse_literal::<TimeframeBlock>);
    let tf_entry = required(fields, "tfEntry", &mut errors, parse_literal::<TimeframeEntry>);
    let trade_type = required(fields, "tradeType", &mut errors, parse_literal::<TradeType>);
    let result = required(fields, "result", &mut errors, parse_literal::<TradeResult>);
    let rr = optional(fields, "rr", &mut errors, parse_rr);
    let notes = optional(fields, "notes", &mut errors, |v| parse_notes(v, rules));
    let screenshot_url = optional(fields, "screenshotUrl", &mut errors, parse_url);
    let screenshot_id = optional(fields, "screenshotId", &mut errors, parse_public_id);

    match (
        date,
        session,
        pair,
        trend_main,
        trend_secondary,
        tf_block,
        tf_entry,
        trade_type,
        result,
    ) {
        (
            Some(date),
            Some(session),
            Some(pair),
            Some(trend_main),
            Some(trend_secondary),
            Some(tf_block),
            Some(tf_entry),
            Some(trade_type),
            Some(result),
        ) if errors.is_empty() => Ok(NewTrade {
            date,
            session,
            pair,
            trend_main,
            trend_secondary,
            tf_block,
            tf_entry,
            trade_type,
            rr,
            result,
            notes,
            screenshot_url,
            screenshot_id,
        }),
        _ => Err(errors),
    }
}

/// Validate a partial update.
///
/// Every field is optional; `rr`, `notes`, `screenshotUrl` and
/// `screenshotId` additionally accept `null` to clear the stored value.
/// At least one field must be supplied.
pub fn validate_update(
    input: &Value,
    rules: &ValidationRules,
) -> Result<TradePatch, ValidationError> {
    let fields = as_object(input)?;
    if fields.is_empty() {
        return Err(ValidationError::form(
            "At least one field must be provided for update",
        ));
    }

    let mut errors = ValidationError::default();
    reject_unknown_keys(fields, &mut errors);

    let patch = TradePatch {
        date: optional(fields, "date", &mut errors, parse_date),
        session: optional(fields, "session", &mut errors, parse_literal::<Session>),
        pair: optional(fields, "pair", &mut errors, parse_literal::<Pair>),
        trend_main: optional(fields, "trendMain", &mut errors, parse_literal::<Trend>),
        trend_secondary: optional(fields, "trendSecondary", &mut errors, parse_literal::<Trend>),
        tf_block: optional(fields, "tfBlock", &mut errors, parse_literal::<TimeframeBlock>),
        tf_entry: optional(fields, "tfEntry", &mut errors, parse_literal::<TimeframeEntry>),
        trade_type: optional(fields, "tradeType", &mut errors, parse_literal::<TradeType>),
        rr: clearable(fields, "rr", &mut errors, parse_rr),
        result: optional(fields, "result", &mut errors, parse_literal::<TradeResult>),
        notes: clearable(fields, "notes", &mut errors, |v| parse_notes(v, rules)),
        screenshot_url: clearable(fields, "screenshotUrl", &mut errors, parse_url),
        screenshot_id: clearable(fields, "screenshotId", &mut errors, parse_public_id),
    };

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

fn as_object(input: &Value) -> Result<&Map<String, Value>, ValidationError> {
    input
        .as_object()
        .ok_or_else(|| ValidationError::form(format!("Expected object, received {}", kind(input))))
}

fn reject_unknown_keys(fields: &Map<String, Value>, errors: &mut ValidationError) {
    let unknown: Vec<String> = fields
        .keys()
        .filter(|key| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|key| format!("'{key}'"))
        .collect();
    if !unknown.is_empty() {
        errors
            .form_errors
            .push(format!("Unrecognized key(s) in object: {}", unknown.join(", ")));
    }
}

fn required<T>(
    fields: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationError,
    parse: impl FnOnce(&Value) -> Result<T, String>,
) -> Option<T> {
    match fields.get(key) {
        None => {
            errors.push_field(key, "Required");
            None
        }
        Some(value) => checked(key, value, errors, parse),
    }
}

fn optional<T>(
    fields: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationError,
    parse: impl FnOnce(&Value) -> Result<T, String>,
) -> Option<T> {
    fields
        .get(key)
        .and_then(|value| checked(key, value, errors, parse))
}

fn clearable<T>(
    fields: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationError,
    parse: impl FnOnce(&Value) -> Result<T, String>,
) -> Option<Option<T>> {
    match fields.get(key) {
        None => None,
        Some(Value::Null) => Some(None),
        Some(value) => checked(key, value, errors, parse).map(Some),
    }
}

fn checked<T>(
    key: &str,
    value: &Value,
    errors: &mut ValidationError,
    parse: impl FnOnce(&Value) -> Result<T, String>,
) -> Option<T> {
    if value.is_null() {
        errors.push_field(key, "Expected a value, received null");
        return None;
    }
    match parse(value) {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            errors.push_field(key, message);
            None
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("Expected string, received {}", kind(value)))
}

fn parse_literal<E: ClosedSet>(value: &Value) -> Result<E, String> {
    let raw = expect_str(value)?;
    E::from_literal(raw).ok_or_else(|| {
        let expected: Vec<String> = E::LITERALS.iter().map(|l| format!("'{l}'")).collect();
        format!(
            "Invalid enum value. Expected {}, received '{raw}'",
            expected.join(" | ")
        )
    })
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM[:SS[.fff]]`
/// datetimes and plain `YYYY-MM-DD` dates.
fn parse_date(value: &Value) -> Result<String, String> {
    let raw = expect_str(value)?.trim();
    let parseable = DateTime::parse_from_rfc3339(raw).is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok();

    if parseable {
        Ok(raw.to_string())
    } else {
        Err("Invalid date".to_string())
    }
}

fn parse_rr(value: &Value) -> Result<String, String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(format!("Expected string or number, received {}", kind(other))),
    };
    if RR_PATTERN.is_match(&raw) {
        Ok(raw)
    } else {
        Err("Use formats like 2 or 1:2".to_string())
    }
}

fn parse_notes(value: &Value, rules: &ValidationRules) -> Result<String, String> {
    let trimmed = expect_str(value)?.trim();
    if trimmed.chars().count() <= rules.notes_max_chars {
        Ok(trimmed.to_string())
    } else {
        Err(format!("Must be 0-{} chars", rules.notes_max_chars))
    }
}

fn parse_url(value: &Value) -> Result<String, String> {
    let raw = expect_str(value)?;
    url::Url::parse(raw)
        .map(|_| raw.to_string())
        .map_err(|_| "Invalid url".to_string())
}

fn parse_public_id(value: &Value) -> Result<String, String> {
    let raw = expect_str(value)?;
    if PUBLIC_ID_PATTERN.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err("Invalid public_id".to_string())
    }
}
