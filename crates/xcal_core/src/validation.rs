//! Validation of user-supplied time bounds and query parameters.
//!
//! # Responsibility
//! - Reject malformed input before it reaches the external tool or SQLite.
//!
//! # Invariants
//! - A blank bound means "no bound"; it is never passed on.
//! - An accepted bound never starts with `-`, so it cannot be read as a flag.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_BOUND_CHARS: usize = 64;

static TIME_BOUND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 :/.,+\-]*$").expect("valid time bound regex")
});
static QUERY_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4} \d{2} \d{2}$").expect("valid query date regex"));

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    TimeBound { value: String, reason: &'static str },
    QueryDate(String),
    Priority(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeBound { value, reason } => {
                write!(f, "invalid time bound `{value}`: {reason}")
            }
            Self::QueryDate(value) => {
                write!(f, "invalid date `{value}`; expected `YYYY MM DD`")
            }
            Self::Priority(value) => write!(f, "invalid priority `{value}`; expected an integer"),
        }
    }
}

impl Error for ValidationError {}

/// A validated, non-blank filter time bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBound(String);

impl TimeBound {
    /// Validates `raw`; blank input yields `Ok(None)`.
    pub fn parse(raw: &str) -> ValidationResult<Option<Self>> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(None);
        }
        if value.chars().count() > MAX_BOUND_CHARS {
            return Err(ValidationError::TimeBound {
                value: value.to_string(),
                reason: "too long",
            });
        }
        if !TIME_BOUND_RE.is_match(value) {
            return Err(ValidationError::TimeBound {
                value: value.to_string(),
                reason: "unsupported characters",
            });
        }
        Ok(Some(Self(value.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TimeBound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a `YYYY MM DD` query date.
pub fn parse_query_date(raw: &str) -> ValidationResult<NaiveDate> {
    let value = raw.trim();
    if !QUERY_DATE_RE.is_match(value) {
        return Err(ValidationError::QueryDate(value.to_string()));
    }
    NaiveDate::parse_from_str(value, "%Y %m %d")
        .map_err(|_| ValidationError::QueryDate(value.to_string()))
}

/// Parses a to-do priority given as a decimal integer.
pub fn parse_priority(raw: &str) -> ValidationResult<i64> {
    let value = raw.trim();
    value
        .parse::<i64>()
        .map_err(|_| ValidationError::Priority(value.to_string()))
}
