//! Seams between the engine and concrete file formats.
//!
//! The engine only sees [`TableSource`] and [`ReportSink`]; `certwatch-io`
//! implements them for workbooks and CSV directories. The in-memory versions
//! here back tests and embedding callers.

use log::info;

use crate::config::InputConfig;
use crate::error::ReconError;
use crate::model::{ReconInput, ReportBundle};
use crate::table::Table;

/// Anything that can hand out named tables.
pub trait TableSource {
    /// Names of every table the source exposes, in source order.
    fn table_names(&self) -> Vec<String>;

    /// Load one table. Fails with [`ReconError::MissingSheet`] when absent.
    fn read_table(&mut self, name: &str) -> Result<Table, ReconError>;
}

/// Destination for a finished report bundle.
///
/// Implementations must be all-or-nothing: on error, no partial output may
/// remain at the destination.
pub trait ReportSink {
    fn write_bundle(&mut self, bundle: &ReportBundle) -> Result<(), ReconError>;
}

/// Load the source and month tables named in the input config.
pub fn load_input(source: &mut dyn TableSource, input: &InputConfig) -> Result<ReconInput, ReconError> {
    let source_table = source.read_table(&input.source_sheet)?;
    let month_table = source.read_table(&input.month_sheet)?;
    info!(
        "read '{}' ({} rows) and '{}' ({} rows)",
        source_table.name(),
        source_table.row_count(),
        month_table.name(),
        month_table.row_count()
    );
    Ok(ReconInput {
        source: source_table,
        month: month_table,
    })
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: Vec<Table>,
}

impl MemorySource {
    pub fn new(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }
}

impl TableSource for MemorySource {
    fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name().to_string()).collect()
    }

    fn read_table(&mut self, name: &str) -> Result<Table, ReconError> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| ReconError::MissingSheet {
                sheet: name.to_string(),
                available: self.table_names(),
            })
    }
}

/// Keeps the last bundle written to it.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub written: Option<ReportBundle>,
}

impl ReportSink for MemorySink {
    fn write_bundle(&mut self, bundle: &ReportBundle) -> Result<(), ReconError> {
        self.written = Some(bundle.clone());
        Ok(())
    }
}
