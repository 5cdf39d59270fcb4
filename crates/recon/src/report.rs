//! Output bundle assembly: source sheet, updated month sheet, issues sheet.

use log::warn;

use crate::config::OutputConfig;
use crate::matcher::{merged_table, JoinOutput};
use crate::model::{Diagnostic, ReportBundle};
use crate::resolve::{ColumnResolver, Resolution};
use crate::table::{CellValue, Table};

/// Restrict `table` to a logical column order, mapping each logical name to
/// the table's own spelling.
///
/// A logical name with no case-insensitive match is kept verbatim as an
/// all-empty column and reported as a [`Diagnostic::CaseMappingGap`].
pub fn project_columns(table: &Table, sheet: &str, logical: &[String]) -> (Table, Vec<Diagnostic>) {
    let resolver = ColumnResolver::new(table.columns());
    let mapping: Vec<Resolution<'_>> = logical.iter().map(|name| resolver.map_logical(name)).collect();

    let diagnostics: Vec<Diagnostic> = mapping
        .iter()
        .filter_map(|m| match m {
            Resolution::Gap { name } => Some(Diagnostic::CaseMappingGap {
                sheet: sheet.to_string(),
                column: name.to_string(),
            }),
            Resolution::Found { .. } => None,
        })
        .collect();

    let columns = mapping.iter().map(|m| m.output_name().to_string()).collect();
    let rows = table.rows().iter().map(|row| {
        mapping
            .iter()
            .map(|m| {
                m.index()
                    .and_then(|i| row.get(i))
                    .cloned()
                    .unwrap_or(CellValue::Missing)
                    .filled()
            })
            .collect()
    });

    (Table::with_rows(sheet, columns, rows), diagnostics)
}

/// Every missing value written as an explicit empty cell.
fn filled(table: &Table, sheet: &str) -> Table {
    Table::with_rows(
        sheet,
        table.columns().to_vec(),
        table
            .rows()
            .iter()
            .map(|row| row.iter().cloned().map(CellValue::filled).collect()),
    )
}

/// Build the output bundle.
///
/// `source` and `month` are the normalized working tables; `month_comparison`
/// is the month table the join ran against (warning column excluded). The
/// issues sheet is only present when the join produced issue rows.
pub fn assemble(
    source: &Table,
    month: &Table,
    month_comparison: &Table,
    join: &JoinOutput,
    output: &OutputConfig,
) -> (ReportBundle, Vec<Diagnostic>) {
    let mut sheets = Vec::with_capacity(3);

    sheets.push(filled(source, &output.source_sheet));

    let (updated, diagnostics) = project_columns(month, &output.month_sheet, &output.month_columns);
    for d in &diagnostics {
        warn!("{d}");
    }
    sheets.push(updated);

    if join.issues().next().is_some() {
        sheets.push(merged_table(
            &output.issues_sheet,
            source,
            month_comparison,
            &join.keys,
            join.issues().copied(),
        ));
    }

    (ReportBundle { sheets }, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::outer_join;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn projection_maps_casing_and_order() {
        let month = Table::with_rows(
            "month",
            cols(&["EMAIL", "Id", "d-warn"]),
            vec![vec!["a@x".into(), 1.0.into(), CellValue::Missing]],
        );
        let (t, diags) = project_columns(&month, "out", &cols(&["id", "d-warn", "email"]));
        assert!(diags.is_empty());
        assert_eq!(t.name(), "out");
        assert_eq!(t.columns(), cols(&["Id", "d-warn", "EMAIL"]).as_slice());
        let row: Vec<CellValue> = vec![1.0.into(), "".into(), "a@x".into()];
        assert_eq!(t.rows()[0], row);
    }

    #[test]
    fn projection_gap_is_reported_and_written_empty() {
        let month = Table::with_rows("month", cols(&["id"]), vec![vec![1.0.into()]]);
        let (t, diags) = project_columns(&month, "month (Updated)", &cols(&["id", "ok-id"]));
        assert_eq!(t.columns(), cols(&["id", "ok-id"]).as_slice());
        assert_eq!(t.get(0, 1), Some(&CellValue::from("")));
        assert_eq!(
            diags,
            vec![Diagnostic::CaseMappingGap {
                sheet: "month (Updated)".into(),
                column: "ok-id".into(),
            }]
        );
    }

    #[test]
    fn issues_sheet_only_when_needed() {
        let source = Table::with_rows("Source", cols(&["id"]), vec![vec![1.0.into()]]);
        let month = Table::with_rows("month", cols(&["id", "d-warn"]), vec![vec![1.0.into(), "x".into()]]);
        let comparison = month.without_columns(&[1]);
        let output = OutputConfig::default();

        let join = outer_join(&source, &comparison);
        let (bundle, _) = assemble(&source, &month, &comparison, &join, &output);
        assert_eq!(bundle.sheet_names(), ["Source", "month (Updated)"]);

        let month2 = Table::with_rows("month", cols(&["id", "d-warn"]), vec![vec![2.0.into(), "x".into()]]);
        let comparison2 = month2.without_columns(&[1]);
        let join2 = outer_join(&source, &comparison2);
        let (bundle2, _) = assemble(&source, &month2, &comparison2, &join2, &output);
        assert_eq!(bundle2.sheet_names(), ["Source", "month (Updated)", "issues"]);
        let issues = bundle2.sheet("issues").unwrap();
        assert_eq!(issues.row_count(), 2);
        // Warning column never leaks into the issues sheet
        assert_eq!(issues.columns(), cols(&["id"]).as_slice());
    }

    #[test]
    fn source_sheet_keeps_column_order_and_fills_missing() {
        let source = Table::with_rows(
            "Source",
            cols(&["z", "a", "d-exp"]),
            vec![vec![CellValue::Missing, "q".into(), "2025-06-10".into()]],
        );
        let month = Table::with_rows("month", cols(&["a"]), vec![vec!["q".into()]]);
        let join = outer_join(&source, &month);
        let (bundle, _) = assemble(&source, &month, &month, &join, &OutputConfig::default());
        let out = bundle.sheet("Source").unwrap();
        assert_eq!(out.columns(), cols(&["z", "a", "d-exp"]).as_slice());
        assert_eq!(out.get(0, 0), Some(&CellValue::from("")));
    }
}
