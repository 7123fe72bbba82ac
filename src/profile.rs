//! Column profiler: type inference, cardinality, missingness and numeric
//! summary statistics for a single column.
//!
//! Type inference walks [`INFERENCE_RULES`] in priority order and picks the
//! first type whose predicate accepts at least [`TYPE_INFERENCE_THRESHOLD`] of
//! the column's non-missing values. Columns with no non-missing values, or
//! where no rule reaches the threshold, are [`ColumnType::String`].

use std::{collections::HashSet, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{parser::Table, value};

/// Minimum share of non-missing values a rule must accept.
pub const TYPE_INFERENCE_THRESHOLD: f64 = 0.8;

/// Type used when no rule reaches the threshold.
pub const FALLBACK_TYPE: ColumnType = ColumnType::String;

type TypePredicate = fn(&str) -> bool;

pub const INFERENCE_RULES: &[(ColumnType, TypePredicate)] = &[
    (ColumnType::Number, value::is_number),
    (ColumnType::Date, value::is_date),
    (ColumnType::Boolean, value::is_boolean_token),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    String,
    Date,
    Boolean,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub standard_deviation: f64,
}

impl NumericStatistics {
    /// Summarises `values`; `None` when there is nothing to summarise.
    ///
    /// Finite inputs always give finite statistics: when the plain sums
    /// overflow, mean and variance are recomputed on values scaled by the
    /// largest magnitude.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in values {
            min = min.min(value);
            max = max.max(value);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        // lower-middle for even lengths
        let median = sorted[(sorted.len() - 1) / 2];

        let (mut mean, mut standard_deviation) = mean_and_std(values, 1.0);
        if !mean.is_finite() || !standard_deviation.is_finite() {
            let scale = min.abs().max(max.abs());
            (mean, standard_deviation) = mean_and_std(values, scale);
        }

        Some(Self {
            min,
            max,
            mean,
            median,
            standard_deviation,
        })
    }
}

/// Population mean and standard deviation of `values / scale`, scaled back.
fn mean_and_std(values: &[f64], scale: f64) -> (f64, f64) {
    let count = values.len() as f64;
    let mean = values.iter().map(|value| value / scale).sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|value| (value / scale - mean).powi(2))
        .sum::<f64>()
        / count;
    (mean * scale, variance.sqrt() * scale)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub unique_values: usize,
    pub missing_values: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<NumericStatistics>,
}

pub fn profile_column(table: &Table, column_index: usize) -> ColumnProfile {
    let name = table
        .headers()
        .get(column_index)
        .cloned()
        .unwrap_or_default();
    let values = table.column(column_index).collect::<Vec<_>>();

    let unique_values = values.iter().copied().collect::<HashSet<_>>().len();
    let present = values
        .iter()
        .copied()
        .filter(|v| !value::is_missing(v))
        .collect::<Vec<_>>();
    let missing_values = values.len() - present.len();

    let column_type = infer_type(&present);
    let statistics = if column_type == ColumnType::Number {
        let numbers = present
            .iter()
            .filter_map(|v| value::parse_number(v))
            .collect::<Vec<_>>();
        NumericStatistics::from_values(&numbers)
    } else {
        None
    };
    debug!(
        "Column '{name}': type {column_type}, {unique_values} unique, {missing_values} missing"
    );

    ColumnProfile {
        name,
        column_type,
        unique_values,
        missing_values,
        statistics,
    }
}

pub fn profile_columns(table: &Table) -> Vec<ColumnProfile> {
    (0..table.column_count())
        .map(|idx| profile_column(table, idx))
        .collect()
}

/// Picks a type for the given non-missing values.
pub fn infer_type(present: &[&str]) -> ColumnType {
    if present.is_empty() {
        return FALLBACK_TYPE;
    }
    let total = present.len() as f64;
    INFERENCE_RULES
        .iter()
        .find(|(_, accepts)| {
            let matches = present.iter().filter(|v| accepts(v)).count();
            matches as f64 / total >= TYPE_INFERENCE_THRESHOLD
        })
        .map(|(column_type, _)| *column_type)
        .unwrap_or(FALLBACK_TYPE)
}
