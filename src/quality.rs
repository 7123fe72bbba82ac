//! Table-wide data-quality metrics: completeness, per-cell type consistency,
//! duplicate rows and IQR outliers.
//!
//! Consistency is computed from per-cell [`CellKind`]s and is deliberately
//! independent of the column-level type chosen by the profiler, so a column
//! profiled as a number can still count as inconsistent.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    parser::Table,
    value::{self, CellKind},
};

/// Share of cells the dominant kind must hold for a column to be consistent.
pub const CONSISTENCY_THRESHOLD: f64 = 0.9;
pub const IQR_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub completeness: f64,
    pub consistency: f64,
    pub duplicate_rows: usize,
    pub outliers: BTreeMap<String, Vec<f64>>,
}

impl QualityMetrics {
    pub fn outlier_count(&self, column: &str) -> usize {
        self.outliers.get(column).map_or(0, Vec::len)
    }
}

pub fn assess_quality(table: &Table) -> QualityMetrics {
    QualityMetrics {
        completeness: completeness(table),
        consistency: consistency(table),
        duplicate_rows: count_duplicate_rows(table.rows()),
        outliers: detect_outliers(table),
    }
}

pub fn completeness(table: &Table) -> f64 {
    let total = table.cell_count();
    if total == 0 {
        return 0.0;
    }
    let filled = table
        .rows()
        .iter()
        .flatten()
        .filter(|cell| !value::is_missing(cell))
        .count();
    filled as f64 / total as f64
}

/// Rows that repeat an earlier row exactly; first occurrences are not counted.
pub fn count_duplicate_rows(rows: &[Vec<String>]) -> usize {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.iter().filter(|row| !seen.insert(row.as_slice())).count()
}

pub fn consistency(table: &Table) -> f64 {
    let columns = table.column_count();
    if columns == 0 {
        return 0.0;
    }
    let consistent = (0..columns)
        .filter(|&idx| is_column_consistent(table.column(idx)))
        .count();
    consistent as f64 / columns as f64
}

pub fn is_column_consistent<'a>(cells: impl IntoIterator<Item = &'a str>) -> bool {
    match dominant_kind(cells) {
        Some((_, count, total)) => count as f64 / total as f64 >= CONSISTENCY_THRESHOLD,
        None => false,
    }
}

/// Returns the most frequent kind with its count and the number of cells seen.
/// Ties go to the kind encountered first.
pub fn dominant_kind<'a>(
    cells: impl IntoIterator<Item = &'a str>,
) -> Option<(CellKind, usize, usize)> {
    let mut counts: Vec<(CellKind, usize)> = Vec::new();
    let mut total = 0usize;
    for cell in cells {
        total += 1;
        let kind = CellKind::classify(cell);
        match counts.iter_mut().find(|(seen, _)| *seen == kind) {
            Some((_, count)) => *count += 1,
            None => counts.push((kind, 1)),
        }
    }
    let mut best: Option<(CellKind, usize)> = None;
    for (kind, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((kind, count));
        }
    }
    best.map(|(kind, count)| (kind, count, total))
}

pub fn detect_outliers(table: &Table) -> BTreeMap<String, Vec<f64>> {
    let mut outliers = BTreeMap::new();
    for (idx, header) in table.headers().iter().enumerate() {
        let values = table
            .column(idx)
            .filter_map(value::parse_number)
            .collect::<Vec<_>>();
        if values.is_empty() {
            continue;
        }
        outliers.insert(header.clone(), iqr_outliers(&values));
    }
    outliers
}

/// Values strictly outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`, in input order.
pub fn iqr_outliers(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = interpolated_quantile(&sorted, 0.25);
    let q3 = interpolated_quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - IQR_MULTIPLIER * iqr;
    let upper = q3 + IQR_MULTIPLIER * iqr;
    values
        .iter()
        .copied()
        .filter(|v| *v < lower || *v > upper)
        .collect()
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
pub fn interpolated_quantile(sorted: &[f64], quantile: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * quantile;
    let base = position.floor() as usize;
    let rest = position - base as f64;
    match sorted.get(base + 1) {
        Some(next) => sorted[base] + rest * (next - sorted[base]),
        None => sorted[base],
    }
}
