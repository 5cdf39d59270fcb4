//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | Mismatches found (only with `--strict-exit`)         |
//! | 2    | Usage error (bad args, refusing to overwrite)        |
//! | 3    | Input workbook/directory not found                   |
//! | 4    | Required sheet missing                               |
//! | 5    | Required column missing                              |
//! | 6    | Unparseable or out-of-range date                     |
//! | 7    | Output could not be written                          |
//! | 8    | Config unreadable or invalid                         |
//! | 9    | Other I/O failure while reading input                |

use certwatch_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Reconciliation found issue rows and `--strict-exit` was given.
/// Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_MISMATCHES: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

pub const EXIT_MISSING_INPUT: u8 = 3;

pub const EXIT_MISSING_SHEET: u8 = 4;

pub const EXIT_MISSING_COLUMN: u8 = 5;

/// A date cell could not be parsed, or the warning date left the calendar.
pub const EXIT_DATE_PARSE: u8 = 6;

/// Output workbook or summary file could not be written.
pub const EXIT_WRITE: u8 = 7;

pub const EXIT_INVALID_CONFIG: u8 = 8;

pub const EXIT_IO: u8 = 9;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::MissingInput(_) => EXIT_MISSING_INPUT,
        ReconError::MissingSheet { .. } => EXIT_MISSING_SHEET,
        ReconError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        ReconError::DateParse { .. } | ReconError::DateOutOfRange { .. } => EXIT_DATE_PARSE,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Io(_) => EXIT_IO,
        ReconError::Write(_) => EXIT_WRITE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_MISMATCHES,
            EXIT_USAGE,
            EXIT_MISSING_INPUT,
            EXIT_MISSING_SHEET,
            EXIT_MISSING_COLUMN,
            EXIT_DATE_PARSE,
            EXIT_WRITE,
            EXIT_INVALID_CONFIG,
            EXIT_IO,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_codes() {
        let sheet = ReconError::MissingSheet { sheet: "month".into(), available: vec![] };
        assert_eq!(recon_exit_code(&sheet), EXIT_MISSING_SHEET);
        let date = ReconError::DateParse {
            table: "Source".into(),
            column: "d-exp".into(),
            row: 3,
            value: "soon".into(),
        };
        assert_eq!(recon_exit_code(&date), EXIT_DATE_PARSE);
        assert_eq!(recon_exit_code(&ReconError::Write("x".into())), EXIT_WRITE);
    }
}
