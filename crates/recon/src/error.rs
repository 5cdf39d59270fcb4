use std::fmt;

/// Fatal reconciliation errors. Any of these aborts the run before the
/// output bundle is written.
#[derive(Debug)]
pub enum ReconError {
    /// The input workbook or directory does not exist.
    MissingInput(String),
    /// A required named table is absent from the input.
    MissingSheet { sheet: String, available: Vec<String> },
    /// A required column is absent from a table.
    MissingColumn { table: String, column: String },
    /// A value in a date column is not a recognizable date.
    DateParse { table: String, column: String, row: usize, value: String },
    /// Date arithmetic left the representable calendar range.
    DateOutOfRange { table: String, row: usize, date: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty name, duplicate sheet, etc.).
    ConfigValidation(String),
    /// IO error while reading input.
    Io(String),
    /// The output bundle could not be produced.
    Write(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput(path) => write!(f, "input not found: {path}"),
            Self::MissingSheet { sheet, available } => {
                if available.is_empty() {
                    write!(f, "missing sheet '{sheet}'")
                } else {
                    write!(f, "missing sheet '{sheet}' (available: {})", available.join(", "))
                }
            }
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::DateParse { table, column, row, value } => {
                write!(f, "table '{table}', column '{column}', row {row}: cannot parse date '{value}'")
            }
            Self::DateOutOfRange { table, row, date } => {
                write!(f, "table '{table}', row {row}: date {date} out of range")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Write(msg) => write!(f, "write error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
