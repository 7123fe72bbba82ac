//! Analysis orchestrator: parse, profile, assess and recommend in one pass.
//!
//! [`analyze`] is the entry point for raw text. It performs no I/O and knows
//! nothing about insight or history collaborators; those are layered on top
//! by [`crate::session`].

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::AnalysisError,
    parser::{self, Table},
    profile::{self, ColumnProfile, ColumnType},
    quality::{self, QualityMetrics},
    recommend,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub missing_values: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub summary: DataSummary,
    pub column_profiles: Vec<ColumnProfile>,
    pub quality_metrics: QualityMetrics,
    pub recommendations: Vec<String>,
}

pub fn analyze(raw_text: &str, filename: &str) -> Result<AnalysisReport, AnalysisError> {
    let table = parser::parse(raw_text)?;
    Ok(analyze_table(&table, filename))
}

/// Runs every stage after parsing on an already-validated table.
pub fn analyze_table(table: &Table, filename: &str) -> AnalysisReport {
    let column_profiles = profile::profile_columns(table);
    let quality_metrics = quality::assess_quality(table);
    let recommendations = recommend::recommend(table, &column_profiles, &quality_metrics);

    let summary = DataSummary {
        total_rows: table.row_count(),
        total_columns: table.column_count(),
        columns: column_profiles
            .iter()
            .map(|profile| ColumnSummary {
                name: profile.name.clone(),
                column_type: profile.column_type,
                missing_values: profile.missing_values,
            })
            .collect(),
    };
    info!(
        "Analyzed '{filename}': {} row(s), {} column(s), {} recommendation(s)",
        summary.total_rows,
        summary.total_columns,
        recommendations.len()
    );

    AnalysisReport {
        summary,
        column_profiles,
        quality_metrics,
        recommendations,
    }
}
