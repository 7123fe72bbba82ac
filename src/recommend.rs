//! Rule-based recommendations derived from column profiles and quality metrics.
//!
//! Rules fire in a fixed order: completeness, duplicates, then per column (in
//! header order) missing values followed by outliers, then consistency, and
//! finally the per-column identifier notes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    parser::Table,
    profile::{ColumnProfile, ColumnType},
    quality::QualityMetrics,
};

pub const MIN_COMPLETENESS: f64 = 0.9;
pub const MIN_CONSISTENCY: f64 = 0.9;
/// Percentage of missing cells above which a column is called out.
pub const MAX_MISSING_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    LowCompleteness,
    DuplicateRows { count: usize },
    MissingValues { column: String, percent: f64 },
    Outliers { column: String, count: usize },
    InconsistentTypes,
    PossibleIdentifier { column: String },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::LowCompleteness => write!(
                f,
                "Consider handling missing values through imputation or removal to improve data completeness."
            ),
            Recommendation::DuplicateRows { count } => write!(
                f,
                "Found {count} duplicate rows. Consider removing duplicates for more accurate analysis."
            ),
            Recommendation::MissingValues { column, percent } => write!(
                f,
                "Column \"{column}\" has {percent:.1}% missing values. Consider if this column is necessary or if missing data can be collected."
            ),
            Recommendation::Outliers { column, count } => write!(
                f,
                "Found {count} potential outliers in \"{column}\". Review these values for accuracy."
            ),
            Recommendation::InconsistentTypes => write!(
                f,
                "Some columns have inconsistent data types. Consider standardizing data formats for better analysis."
            ),
            Recommendation::PossibleIdentifier { column } => write!(
                f,
                "Column \"{column}\" has all unique values. This might be an ID column or contain unique identifiers."
            ),
        }
    }
}

pub fn recommendations(
    table: &Table,
    profiles: &[ColumnProfile],
    metrics: &QualityMetrics,
) -> Vec<Recommendation> {
    let row_count = table.row_count();
    let mut out = Vec::new();

    if metrics.completeness < MIN_COMPLETENESS {
        out.push(Recommendation::LowCompleteness);
    }
    if metrics.duplicate_rows > 0 {
        out.push(Recommendation::DuplicateRows {
            count: metrics.duplicate_rows,
        });
    }

    for profile in profiles {
        if profile.missing_values > 0 && row_count > 0 {
            let percent = profile.missing_values as f64 / row_count as f64 * 100.0;
            if percent > MAX_MISSING_PERCENT {
                out.push(Recommendation::MissingValues {
                    column: profile.name.clone(),
                    percent,
                });
            }
        }
        if profile.column_type == ColumnType::Number && profile.statistics.is_some() {
            let count = metrics.outlier_count(&profile.name);
            if count > 0 {
                out.push(Recommendation::Outliers {
                    column: profile.name.clone(),
                    count,
                });
            }
        }
    }

    if metrics.consistency < MIN_CONSISTENCY {
        out.push(Recommendation::InconsistentTypes);
    }

    if row_count > 0 {
        out.extend(
            profiles
                .iter()
                .filter(|profile| profile.unique_values == row_count)
                .map(|profile| Recommendation::PossibleIdentifier {
                    column: profile.name.clone(),
                }),
        );
    }

    out
}

pub fn recommend(
    table: &Table,
    profiles: &[ColumnProfile],
    metrics: &QualityMetrics,
) -> Vec<String> {
    recommendations(table, profiles, metrics)
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{parser::parse, profile::profile_columns, quality::assess_quality};

    fn metrics(completeness: f64, consistency: f64, duplicate_rows: usize) -> QualityMetrics {
        QualityMetrics {
            completeness,
            consistency,
            duplicate_rows,
            outliers: BTreeMap::new(),
        }
    }

    #[test]
    fn completeness_precedes_duplicates() {
        let table = parse("a\nx\nx\nx\nx\n").expect("parse");
        let profiles = profile_columns(&table);
        let recs = recommend(&table, &profiles, &metrics(0.5, 1.0, 3));
        assert!(recs[0].contains("completeness"));
        assert!(recs[1].starts_with("Found 3 duplicate rows"));
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn per_column_rules_interleave_in_header_order() {
        let mut text = String::from("score,note,id\n");
        for (i, score) in [1, 2, 3, 4, 5, 100].iter().enumerate() {
            let note = if i < 2 { "ok" } else { "" };
            text.push_str(&format!("{score},{note},{i}\n"));
        }
        let table = parse(&text).expect("parse");
        let profiles = profile_columns(&table);
        let quality = assess_quality(&table);
        let recs = recommendations(&table, &profiles, &quality);

        let expected_head = [
            Recommendation::LowCompleteness,
            Recommendation::Outliers {
                column: "score".to_string(),
                count: 1,
            },
        ];
        assert_eq!(&recs[..2], &expected_head);
        assert!(matches!(
            &recs[2],
            Recommendation::MissingValues { column, .. } if column == "note"
        ));
        assert_eq!(recs[3], Recommendation::InconsistentTypes);
        assert_eq!(
            recs[4..].to_vec(),
            vec![
                Recommendation::PossibleIdentifier {
                    column: "score".to_string()
                },
                Recommendation::PossibleIdentifier {
                    column: "id".to_string()
                },
            ]
        );
    }

    #[test]
    fn ratios_exactly_at_threshold_do_not_fire() {
        let table = parse("a\nx\ny\n").expect("parse");
        let profiles = profile_columns(&table);

        let at_threshold = recommendations(&table, &profiles, &metrics(0.9, 0.9, 0));
        assert!(!at_threshold.contains(&Recommendation::LowCompleteness));
        assert!(!at_threshold.contains(&Recommendation::InconsistentTypes));

        let below = recommendations(&table, &profiles, &metrics(0.899, 0.899, 0));
        assert_eq!(
            &below[..2],
            &[
                Recommendation::LowCompleteness,
                Recommendation::InconsistentTypes
            ]
        );
    }

    #[test]
    fn twenty_percent_missing_is_tolerated() {
        // 1 of 5 blank: completeness is exactly 0.9 and the share exactly 20%
        let table = parse("a,b\n1,x\n2,\n3,y\n4,z\n5,w\n").expect("parse");
        let profiles = profile_columns(&table);
        let quality = assess_quality(&table);
        assert_eq!(quality.completeness, 0.9);

        let recs = recommendations(&table, &profiles, &quality);
        assert_eq!(
            recs,
            vec![
                Recommendation::InconsistentTypes,
                Recommendation::PossibleIdentifier {
                    column: "a".to_string()
                },
                Recommendation::PossibleIdentifier {
                    column: "b".to_string()
                },
            ]
        );
    }

    #[test]
    fn missing_share_above_twenty_percent_fires() {
        let table = parse("a,b\n1,x\n2,\n3,y\n4,z\n").expect("parse");
        let profiles = profile_columns(&table);
        let recs = recommendations(&table, &profiles, &assess_quality(&table));
        assert!(recs.contains(&Recommendation::MissingValues {
            column: "b".to_string(),
            percent: 25.0,
        }));
    }

    #[test]
    fn missing_value_message_formats_one_decimal() {
        let rec = Recommendation::MissingValues {
            column: "city".to_string(),
            percent: 100.0 / 3.0,
        };
        assert_eq!(
            rec.to_string(),
            "Column \"city\" has 33.3% missing values. Consider if this column is necessary or if missing data can be collected."
        );
    }

    #[test]
    fn clean_table_yields_only_identifier_notes() {
        let table = parse("id,group\n1,a\n2,a\n3,b\n").expect("parse");
        let profiles = profile_columns(&table);
        let recs = recommend(&table, &profiles, &assess_quality(&table));
        assert_eq!(
            recs,
            vec![
                "Column \"id\" has all unique values. This might be an ID column or contain unique identifiers."
                    .to_string()
            ]
        );
    }
}
