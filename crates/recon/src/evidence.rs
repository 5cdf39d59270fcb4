use crate::dates::NormalizedTables;
use crate::matcher::{JoinOrigin, JoinOutput};
use crate::model::ReconSummary;

/// Compute summary statistics from a join over the normalized tables.
pub fn compute_summary(tables: &NormalizedTables, join: &JoinOutput) -> ReconSummary {
    let matched = join.count(JoinOrigin::MatchedBoth);
    let source_only = join.count(JoinOrigin::OnlyLeft);
    let month_only = join.count(JoinOrigin::OnlyRight);

    ReconSummary {
        source_rows: tables.source.row_count(),
        month_rows: tables.month.row_count(),
        matched,
        source_only,
        month_only,
        issues: source_only + month_only,
        match_keys: join.keys.iter().map(|k| k.name.clone()).collect(),
        source_expiry_column: tables.source_expiry.clone(),
        month_expiry_column: tables.month_expiry.clone(),
    }
}
