//! Tabular parser: raw CSV text into a validated [`Table`].
//!
//! Lines are split on `\n` / `\r\n`, trimmed, and blank lines are discarded
//! before any structural work happens. Each surviving line is then split into
//! fields by a small quoting state machine:
//!
//! - `""` always yields one literal `"` (both inside and outside quotes)
//! - a lone `"` toggles quoted mode
//! - `,` outside quotes ends the current field
//! - everything else is appended to the current field
//!
//! Fields are trimmed on emission. The first line is the header row; data
//! lines whose width differs from the header, or whose cells are all blank,
//! are dropped without error.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

const FIELD_SEPARATOR: char = ',';
const QUOTE: char = '"';

/// Header row plus rectangular string rows. Never empty in either dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawTable> for Table {
    type Error = ParseError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        Table::new(raw.headers, raw.rows)
    }
}

impl Table {
    /// Builds a table from already-split cells, rejecting empty or ragged input.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ParseError> {
        if headers.is_empty() || headers.iter().any(|h| h.trim().is_empty()) {
            return Err(ParseError::InvalidHeaders);
        }
        if rows.is_empty() {
            return Err(ParseError::NoValidRows);
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(ParseError::MalformedRow {
                line: idx + 2,
                expected: headers.len(),
                found: row.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.column_count()
    }

    /// Iterates the raw cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }
}

/// A parsed table together with the number of data lines that were discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub table: Table,
    pub dropped_rows: usize,
}

pub fn parse(raw_text: &str) -> Result<Table, ParseError> {
    parse_with_details(raw_text).map(|outcome| outcome.table)
}

pub fn parse_with_details(raw_text: &str) -> Result<ParseOutcome, ParseError> {
    if raw_text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut lines = raw_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line);

    let headers = lines.next().ok_or(ParseError::EmptyInput)?;
    let candidates = lines.collect::<Vec<_>>();
    if candidates.is_empty() {
        return Err(ParseError::InsufficientRows);
    }
    if headers.iter().any(|header| header.is_empty()) {
        return Err(ParseError::InvalidHeaders);
    }

    let candidate_count = candidates.len();
    let rows = candidates
        .into_iter()
        .filter(|row| row.len() == headers.len() && row.iter().any(|cell| !cell.is_empty()))
        .collect::<Vec<_>>();
    let dropped_rows = candidate_count - rows.len();
    if dropped_rows > 0 {
        debug!(
            "Dropped {dropped_rows} of {candidate_count} data line(s) with a mismatched width or no values"
        );
    }
    if rows.is_empty() {
        return Err(ParseError::NoValidRows);
    }

    let table = Table::new(headers, rows)?;
    Ok(ParseOutcome {
        table,
        dropped_rows,
    })
}

pub fn parse_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            QUOTE => {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            FIELD_SEPARATOR if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }

    cells.push(current.trim().to_string());
    cells
}
