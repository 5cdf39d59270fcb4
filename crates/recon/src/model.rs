use std::fmt;

use serde::Serialize;

use crate::table::Table;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The two tables of one run, as loaded from the data source.
#[derive(Debug, Clone)]
pub struct ReconInput {
    /// Reference table.
    pub source: Table,
    /// Working table to annotate and validate.
    pub month: Table,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Non-fatal conditions. Recorded in the result and logged; never abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A logical output column has no case-insensitive match; the logical
    /// name is used verbatim with empty values.
    CaseMappingGap { sheet: String, column: String },
    /// Several schema names fold to the same lowercase name; the first wins.
    AmbiguousColumn { table: String, columns: Vec<String> },
    /// The tables share no columns, so reconciliation pairs rows by position.
    EmptyMatchKeys,
    /// The month table already had a warning column; its values were replaced.
    WarningColumnOverwritten { table: String, column: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaseMappingGap { sheet, column } => {
                write!(f, "sheet '{sheet}': no column matching '{column}', written empty")
            }
            Self::AmbiguousColumn { table, columns } => {
                write!(
                    f,
                    "table '{table}': columns {} differ only by case; using '{}'",
                    columns.join(", "),
                    columns.first().map(String::as_str).unwrap_or_default()
                )
            }
            Self::EmptyMatchKeys => write!(f, "no shared columns to match on"),
            Self::WarningColumnOverwritten { table, column } => {
                write!(f, "table '{table}': existing '{column}' values replaced")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Report bundle
// ---------------------------------------------------------------------------

/// Named output tables, in write order. Only produced by a successful run.
#[derive(Debug, Clone, Default)]
pub struct ReportBundle {
    pub sheets: Vec<Table>,
}

impl ReportBundle {
    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|t| t.name() == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Table::name).collect()
    }

    pub fn manifest(&self) -> Vec<SheetManifest> {
        self.sheets
            .iter()
            .map(|t| SheetManifest {
                name: t.name().to_string(),
                rows: t.row_count(),
                columns: t.columns().to_vec(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetManifest {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub source_rows: usize,
    pub month_rows: usize,
    pub matched: usize,
    pub source_only: usize,
    pub month_only: usize,
    pub issues: usize,
    /// Join columns, spelled as in the source table.
    pub match_keys: Vec<String>,
    pub source_expiry_column: String,
    pub month_expiry_column: String,
}

impl ReconSummary {
    pub fn has_issues(&self) -> bool {
        self.issues > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub warning_offset_days: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub sheets: Vec<SheetManifest>,
    pub warnings: Vec<Diagnostic>,
    #[serde(skip)]
    pub bundle: ReportBundle,
}
