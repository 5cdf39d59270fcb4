use log::{info, warn};

use crate::config::ReconConfig;
use crate::dates::{normalize_tables, NormalizedTables};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::{outer_join, JoinOutput};
use crate::model::{Diagnostic, ReconInput, ReconMeta, ReconResult};
use crate::report::assemble;
use crate::resolve::ColumnResolver;
use crate::source::{load_input, ReportSink, TableSource};
use crate::table::Table;

/// Run reconciliation per config. Returns the report bundle + summary.
///
/// Pure: nothing is written anywhere. Any error aborts before a bundle exists.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let mut warnings = Vec::new();
    warnings.extend(schema_diagnostics(&input.source));
    warnings.extend(schema_diagnostics(&input.month));

    let tables = normalize_tables(&input.source, &input.month, &config.dates)?;
    warnings.extend(tables.diagnostics.iter().cloned());

    let (comparison, join) = reconcile(&tables);
    if join.keys.is_empty() {
        warnings.push(Diagnostic::EmptyMatchKeys);
    }

    let summary = compute_summary(&tables, &join);
    if summary.has_issues() {
        info!(
            "{} mismatches found ({} source only, {} month only)",
            summary.issues, summary.source_only, summary.month_only
        );
    } else {
        info!(
            "no mismatches between '{}' and '{}'",
            input.source.name(),
            input.month.name()
        );
    }

    let (bundle, gaps) = assemble(&tables.source, &tables.month, &comparison, &join, &config.output);
    warnings.extend(gaps);

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            warning_offset_days: config.dates.warning_offset_days,
        },
        summary,
        sheets: bundle.manifest(),
        warnings,
        bundle,
    })
}

/// Join the normalized tables. The month side is compared without its
/// warning column, which only exists on that side.
pub fn reconcile(tables: &NormalizedTables) -> (Table, JoinOutput) {
    let comparison = match tables.month.column_index(&tables.month_warning) {
        Some(idx) => tables.month.without_columns(&[idx]),
        None => tables.month.clone(),
    };
    let join = outer_join(&tables.source, &comparison);
    (comparison, join)
}

/// Read from `source`, reconcile, and hand the bundle to `sink`.
///
/// The sink is only called once every stage has succeeded; pass `None` to
/// skip writing (dry run).
pub fn run_with(
    config: &ReconConfig,
    source: &mut dyn TableSource,
    sink: Option<&mut dyn ReportSink>,
) -> Result<ReconResult, ReconError> {
    let input = load_input(source, &config.input)?;
    let result = run(config, &input)?;
    if let Some(sink) = sink {
        sink.write_bundle(&result.bundle)?;
        info!("wrote sheets: {}", result.bundle.sheet_names().join(", "));
    }
    Ok(result)
}

/// Case-insensitive name collisions inside one schema.
fn schema_diagnostics(table: &Table) -> Vec<Diagnostic> {
    ColumnResolver::new(table.columns())
        .ambiguous()
        .into_iter()
        .map(|group| {
            let d = Diagnostic::AmbiguousColumn {
                table: table.name().to_string(),
                columns: group.iter().map(|s| s.to_string()).collect(),
            };
            warn!("{d}");
            d
        })
        .collect()
}
