//! Report and history rendering for the command-line front end.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    analysis::AnalysisReport,
    cli::OutputFormat,
    history::AnalysisRecord,
    profile::ColumnProfile,
    table::{self, Align},
};

/// What the `analyze` command prints: the report plus optional insight text.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedAnalysis<'a> {
    pub filename: &'a str,
    pub report: &'a AnalysisReport,
    pub insights: Option<&'a str>,
}

pub fn render_analysis(analysis: &RenderedAnalysis<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(analysis_text(analysis)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(analysis).context("Serializing report as JSON")
        }
        OutputFormat::Yaml => serde_yaml::to_string(analysis).context("Serializing report as YAML"),
    }
}

pub fn render_history(records: &[AnalysisRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(history_text(records)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(records).context("Serializing history as JSON")
        }
        OutputFormat::Yaml => serde_yaml::to_string(records).context("Serializing history as YAML"),
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

fn format_percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

fn analysis_text(analysis: &RenderedAnalysis<'_>) -> String {
    let report = analysis.report;
    let mut out = String::new();
    let _ = writeln!(out, "File: {}", analysis.filename);
    let _ = writeln!(
        out,
        "Rows: {}  Columns: {}",
        report.summary.total_rows, report.summary.total_columns
    );
    let _ = writeln!(out);

    let headers = [
        "column", "type", "unique", "missing", "min", "max", "mean", "median", "std_dev",
    ]
    .map(String::from);
    let rows = report
        .column_profiles
        .iter()
        .map(profile_row)
        .collect::<Vec<_>>();
    let mut aligns = vec![Align::Right; headers.len()];
    aligns[0] = Align::Left;
    aligns[1] = Align::Left;
    out.push_str(&table::render_aligned(&headers, &rows, &aligns));
    let _ = writeln!(out);

    let metrics = &report.quality_metrics;
    let _ = writeln!(out, "Data quality");
    let _ = writeln!(out, "  completeness: {}", format_percent(metrics.completeness));
    let _ = writeln!(out, "  consistency:  {}", format_percent(metrics.consistency));
    let _ = writeln!(out, "  duplicate rows: {}", metrics.duplicate_rows);
    for (column, values) in metrics.outliers.iter().filter(|(_, v)| !v.is_empty()) {
        let listed = values
            .iter()
            .map(|v| format_number(*v))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "  outliers in {column}: {listed}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Recommendations");
    if report.recommendations.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for (idx, rec) in report.recommendations.iter().enumerate() {
        let _ = writeln!(out, "  {}. {rec}", idx + 1);
    }

    if let Some(insights) = analysis.insights {
        let _ = writeln!(out);
        let _ = writeln!(out, "Insights");
        let _ = writeln!(out, "{insights}");
    }
    out
}

fn profile_row(profile: &ColumnProfile) -> Vec<String> {
    let mut row = vec![
        profile.name.clone(),
        profile.column_type.to_string(),
        profile.unique_values.to_string(),
        profile.missing_values.to_string(),
    ];
    match &profile.statistics {
        Some(stats) => row.extend(
            [
                stats.min,
                stats.max,
                stats.mean,
                stats.median,
                stats.standard_deviation,
            ]
            .map(format_number),
        ),
        None => row.extend(std::iter::repeat_n(String::new(), 5)),
    }
    row
}

fn history_text(records: &[AnalysisRecord]) -> String {
    if records.is_empty() {
        return "No saved analyses.\n".to_string();
    }
    let headers = ["created", "file", "rows", "columns", "recommendations"].map(String::from);
    let rows = records
        .iter()
        .map(|record| {
            vec![
                record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                record.filename.clone(),
                record.report.summary.total_rows.to_string(),
                record.report.summary.total_columns.to_string(),
                record.report.recommendations.len().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    let aligns = [Align::Left, Align::Left, Align::Right, Align::Right, Align::Right];
    table::render_aligned(&headers, &rows, &aligns)
}
