//! Per-cell value checks shared by the column profiler and the quality assessor.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const BOOLEAN_TOKENS: &[&str] = &["true", "false", "0", "1", "yes", "no"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Classification of a single cell, independent of its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Empty,
    Number,
    Date,
    String,
}

impl CellKind {
    pub fn classify(value: &str) -> Self {
        if is_missing(value) {
            CellKind::Empty
        } else if parse_number(value).is_some() {
            CellKind::Number
        } else if parse_date(value).is_some() {
            CellKind::Date
        } else {
            CellKind::String
        }
    }
}

pub fn is_missing(value: &str) -> bool {
    value.trim().is_empty()
}

/// Parses a finite decimal number; `inf`, `NaN` and blanks are rejected.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}

pub fn is_number(value: &str) -> bool {
    parse_number(value).is_some()
}

/// Parses a calendar date or date-time written in a locale-independent format.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(parsed.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

pub fn is_date(value: &str) -> bool {
    parse_date(value).is_some()
}

pub fn is_boolean_token(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    BOOLEAN_TOKENS.contains(&lowered.as_str())
}
