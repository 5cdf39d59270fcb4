//! Expiry date parsing, warning date derivation, and `YYYY-MM-DD` output.

use std::cmp::Ordering;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use log::{debug, warn};

use crate::config::DateConfig;
use crate::error::ReconError;
use crate::model::Diagnostic;
use crate::resolve::ColumnResolver;
use crate::table::{CellValue, Table};

/// Canonical output format for every normalized date.
pub const OUTPUT_FORMAT: &str = "%Y-%m-%d";

/// Day zero of the 1900 spreadsheet date system for serials from 61 on
/// (accounts for the phantom 1900-02-29).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serial of the phantom 1900-02-29. Serials below it count from 1899-12-31.
const PHANTOM_LEAP_SERIAL: f64 = 60.0;

/// Largest serial a spreadsheet accepts (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

const YEAR_FIRST_DATETIME: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const YEAR_FIRST_DATE: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const MONTH_FIRST_DATETIME: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

// `%Y` also takes two digits, so short years need their own list.
const MONTH_FIRST_SHORT_YEAR_DATETIME: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m-%d-%y %H:%M:%S",
    "%m-%d-%y %H:%M",
];

const MONTH_FIRST_DATE: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];
const MONTH_FIRST_SHORT_YEAR: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

const NAMED_MONTH_DATE: &[&str] = &[
    "%d %B %Y",
    "%d-%B-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%b %d %Y",
];

// ---------------------------------------------------------------------------
// Scalar operations
// ---------------------------------------------------------------------------

/// Render a date as zero-padded `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(OUTPUT_FORMAT).to_string()
}

/// `expiry - offset_days`, or `None` if that leaves chrono's calendar range.
pub fn warning_date(expiry: NaiveDate, offset_days: u32) -> Option<NaiveDate> {
    expiry.checked_sub_days(Days::new(u64::from(offset_days)))
}

/// Convert a 1900-system spreadsheet serial to a calendar date, dropping
/// any time-of-day fraction. Serial 1 is 1900-01-01; serial 60 is the
/// phantom 1900-02-29 and has no date.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let day = serial.floor();
    let epoch = match day.partial_cmp(&PHANTOM_LEAP_SERIAL)? {
        Ordering::Less => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        Ordering::Equal => return None,
        Ordering::Greater => {
            let (y, m, d) = SERIAL_EPOCH;
            NaiveDate::from_ymd_opt(y, m, d)?
        }
    };
    epoch.checked_add_days(Days::new(day as u64))
}

/// Like [`from_serial`] but keeps the time of day, rounded to the second.
pub fn from_serial_datetime(serial: f64) -> Option<NaiveDateTime> {
    let date = from_serial(serial)?;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(chrono::Duration::seconds(secs))
}

/// Inverse of [`from_serial_datetime`]. Seconds-level precision. Dates
/// before 1900-01-01 give serials below 1, which spreadsheets do not show.
pub fn to_serial(value: NaiveDateTime) -> f64 {
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|e| e.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let serial = (value - epoch).num_seconds() as f64 / 86_400.0;
    // Counted from 1899-12-30 the phantom day is not yet skipped
    if serial < PHANTOM_LEAP_SERIAL + 1.0 {
        serial - 1.0
    } else {
        serial
    }
}

/// Parse free-form date text. Blank text is not a date.
pub fn parse_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }

    if let Some(d) = parse_compact(s) {
        return Some(d);
    }

    if is_year_first(s) {
        return try_datetime(s, YEAR_FIRST_DATETIME).or_else(|| try_date(s, YEAR_FIRST_DATE));
    }

    let date_part = s.split_whitespace().next().unwrap_or(s);
    let (month_first_datetimes, month_first_dates) = if trailing_digits(date_part) == 2 {
        (MONTH_FIRST_SHORT_YEAR_DATETIME, MONTH_FIRST_SHORT_YEAR)
    } else {
        (MONTH_FIRST_DATETIME, MONTH_FIRST_DATE)
    };

    try_datetime(s, month_first_datetimes)
        .or_else(|| try_date(s, month_first_dates))
        .or_else(|| try_date(s, NAMED_MONTH_DATE))
}

/// Interpret one cell as an expiry date.
///
/// `Ok(None)` for missing or blank cells, `Err(raw)` for anything that is
/// present but not a recognizable date.
pub fn parse_cell(value: &CellValue) -> Result<Option<NaiveDate>, String> {
    match value {
        CellValue::Missing => Ok(None),
        CellValue::Date(d) => Ok(Some(*d)),
        CellValue::DateTime(dt) => Ok(Some(dt.date())),
        CellValue::Number(n) => from_serial(*n).map(Some).ok_or_else(|| value.display()),
        CellValue::Text(s) if s.trim().is_empty() => Ok(None),
        CellValue::Text(s) => parse_text(s).map(Some).ok_or_else(|| s.clone()),
        CellValue::Bool(_) => Err(value.display()),
    }
}

fn try_datetime(s: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.date())
}

fn try_date(s: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats.iter().find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

/// `YYYYMMDD` with exactly eight digits.
fn parse_compact(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[4..6].parse().ok()?;
    let day = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Four leading digits followed by a separator.
fn is_year_first(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() > 4 && b[..4].iter().all(u8::is_ascii_digit) && !b[4].is_ascii_digit()
}

fn trailing_digits(s: &str) -> usize {
    s.bytes().rev().take_while(u8::is_ascii_digit).count()
}

// ---------------------------------------------------------------------------
// Column operations
// ---------------------------------------------------------------------------

/// Parse every value of one column. Rows in errors are 1-based data rows.
pub fn parse_column(table: &Table, col: usize) -> Result<Vec<Option<NaiveDate>>, ReconError> {
    let column = table.columns().get(col).cloned().unwrap_or_default();
    table
        .column(col)
        .enumerate()
        .map(|(i, value)| {
            parse_cell(value).map_err(|raw| ReconError::DateParse {
                table: table.name().to_string(),
                column: column.clone(),
                row: i + 1,
                value: raw,
            })
        })
        .collect()
}

/// Derive the warning date for every expiry date.
pub fn warning_column(
    table: &str,
    expiry: &[Option<NaiveDate>],
    offset_days: u32,
) -> Result<Vec<Option<NaiveDate>>, ReconError> {
    expiry
        .iter()
        .enumerate()
        .map(|(i, d)| match d {
            None => Ok(None),
            Some(d) => warning_date(*d, offset_days).map(Some).ok_or_else(|| {
                ReconError::DateOutOfRange {
                    table: table.to_string(),
                    row: i + 1,
                    date: format_date(*d),
                }
            }),
        })
        .collect()
}

/// Dates as `YYYY-MM-DD` text; absent dates stay `Missing`.
pub fn format_column(dates: &[Option<NaiveDate>]) -> Vec<CellValue> {
    dates
        .iter()
        .map(|d| d.map_or(CellValue::Missing, |d| CellValue::Text(format_date(d))))
        .collect()
}

// ---------------------------------------------------------------------------
// Table normalization
// ---------------------------------------------------------------------------

/// Working copies of both tables after date normalization.
#[derive(Debug, Clone)]
pub struct NormalizedTables {
    pub source: Table,
    pub month: Table,
    /// Expiry column as spelled in each schema.
    pub source_expiry: String,
    pub month_expiry: String,
    /// Warning column as spelled in the month table.
    pub month_warning: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Locate the expiry column in both tables, derive the warning column on
/// `month`, and rewrite every expiry and warning value as `YYYY-MM-DD`.
///
/// The inputs are left untouched. Fails before touching any data if either
/// table lacks the expiry column.
pub fn normalize_tables(
    source: &Table,
    month: &Table,
    config: &DateConfig,
) -> Result<NormalizedTables, ReconError> {
    let month_cols = ColumnResolver::new(month.columns());
    let source_cols = ColumnResolver::new(source.columns());

    let missing = |table: &Table| ReconError::MissingColumn {
        table: table.name().to_string(),
        column: config.expiry_column.clone(),
    };
    let (month_exp_idx, month_exp) = month_cols
        .resolve(&config.expiry_column)
        .map_err(|_| missing(month))?;
    let (source_exp_idx, source_exp) = source_cols
        .resolve(&config.expiry_column)
        .map_err(|_| missing(source))?;

    let month_dates = parse_column(month, month_exp_idx)?;
    let source_dates = parse_column(source, source_exp_idx)?;
    let warn_dates = warning_column(month.name(), &month_dates, config.warning_offset_days)?;

    let mut diagnostics = Vec::new();

    let mut source_out = source.clone();
    source_out.set_column(source_exp_idx, format_column(&source_dates));

    let mut month_out = month.clone();
    month_out.set_column(month_exp_idx, format_column(&month_dates));

    let month_warning = match month_cols.index_of(&config.warning_column) {
        Some(idx) => {
            // Stale input values are discarded, never read.
            let name = month.columns()[idx].clone();
            warn!("table '{}': replacing existing '{}' column with derived values", month.name(), name);
            diagnostics.push(Diagnostic::WarningColumnOverwritten {
                table: month.name().to_string(),
                column: name.clone(),
            });
            month_out.set_column(idx, format_column(&warn_dates));
            name
        }
        None => {
            month_out.add_column(config.warning_column.clone(), format_column(&warn_dates));
            config.warning_column.clone()
        }
    };

    debug!(
        "normalized '{}' ({} rows) and '{}' ({} rows), warning offset {} day(s)",
        source.name(),
        source.row_count(),
        month.name(),
        month.row_count(),
        config.warning_offset_days,
    );

    Ok(NormalizedTables {
        source: source_out,
        month: month_out,
        source_expiry: source_exp.to_string(),
        month_expiry: month_exp.to_string(),
        month_warning,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn warning_date_crosses_month_and_year() {
        assert_eq!(warning_date(ymd(2025, 6, 10), 2), Some(ymd(2025, 6, 8)));
        assert_eq!(warning_date(ymd(2024, 3, 1), 2), Some(ymd(2024, 2, 28)));
        assert_eq!(warning_date(ymd(2024, 3, 2), 2), Some(ymd(2024, 2, 29)));
        assert_eq!(warning_date(ymd(2023, 3, 1), 2), Some(ymd(2023, 2, 27)));
        assert_eq!(warning_date(ymd(2025, 1, 1), 2), Some(ymd(2024, 12, 30)));
    }

    #[test]
    fn warning_date_out_of_range() {
        assert_eq!(warning_date(NaiveDate::MIN, 2), None);
    }

    #[test]
    fn format_is_zero_padded() {
        assert_eq!(format_date(ymd(2025, 1, 5)), "2025-01-05");
        assert_eq!(format_date(ymd(987, 1, 5)), "0987-01-05");
    }

    #[test]
    fn parses_common_text_forms() {
        let want = ymd(2025, 6, 10);
        for s in [
            "2025-06-10",
            " 2025-06-10 ",
            "2025/06/10",
            "2025.06.10",
            "20250610",
            "2025-06-10 13:45:00",
            "2025-06-10T13:45:00",
            "2025-06-10T13:45:00.250",
            "2025-06-10T13:45:00+02:00",
            "2025-06-10T00:00:00Z",
            "06/10/2025",
            "6/10/2025",
            "06-10-2025",
            "06/10/25",
            "06/10/2025 08:30",
            "06/10/2025 08:30 PM",
            "06/10/25 08:30",
            "6/10/25 8:30 PM",
            "10 Jun 2025",
            "10 June 2025",
            "10-Jun-2025",
            "Jun 10, 2025",
            "June 10, 2025",
        ] {
            assert_eq!(parse_text(s), Some(want), "input {s:?}");
        }
    }

    #[test]
    fn rejects_non_dates() {
        for s in ["", "   ", "not a date", "2025-13-01", "2025-02-30", "13/45/2025", "12345"] {
            assert_eq!(parse_text(s), None, "input {s:?}");
        }
    }

    #[test]
    fn serial_numbers() {
        assert_eq!(from_serial(45818.0), Some(ymd(2025, 6, 10)));
        assert_eq!(from_serial(45818.75), Some(ymd(2025, 6, 10)));
        assert_eq!(from_serial(-1.0), None);
        assert_eq!(from_serial(f64::NAN), None);
    }

    #[test]
    fn serials_before_march_1900() {
        assert_eq!(from_serial(1.0), Some(ymd(1900, 1, 1)));
        assert_eq!(from_serial(59.0), Some(ymd(1900, 2, 28)));
        assert_eq!(from_serial(60.0), None);
        assert_eq!(from_serial(60.5), None);
        assert_eq!(from_serial(61.0), Some(ymd(1900, 3, 1)));
        assert_eq!(from_serial(0.0), None);
        assert_eq!(to_serial(ymd(1900, 2, 28).and_hms_opt(0, 0, 0).unwrap()), 59.0);
        assert_eq!(to_serial(ymd(1900, 3, 1).and_hms_opt(0, 0, 0).unwrap()), 61.0);
    }

    #[test]
    fn serial_datetimes_keep_time_of_day() {
        let dt = from_serial_datetime(45818.75).unwrap();
        assert_eq!(dt, ymd(2025, 6, 10).and_hms_opt(18, 0, 0).unwrap());
        assert_eq!(to_serial(dt), 45818.75);
        assert_eq!(to_serial(ymd(2025, 6, 10).and_hms_opt(0, 0, 0).unwrap()), 45818.0);
    }

    #[test]
    fn parse_cell_variants() {
        assert_eq!(parse_cell(&CellValue::Missing), Ok(None));
        assert_eq!(parse_cell(&CellValue::from("  ")), Ok(None));
        assert_eq!(parse_cell(&CellValue::Date(ymd(2025, 1, 2))), Ok(Some(ymd(2025, 1, 2))));
        let dt = ymd(2025, 1, 2).and_hms_opt(23, 59, 0).unwrap();
        assert_eq!(parse_cell(&CellValue::DateTime(dt)), Ok(Some(ymd(2025, 1, 2))));
        assert_eq!(parse_cell(&CellValue::Bool(true)), Err("TRUE".to_string()));
        assert_eq!(parse_cell(&CellValue::from("soon")), Err("soon".to_string()));
    }

    #[test]
    fn normalize_adds_warning_and_formats_both_tables() {
        let source = Table::with_rows(
            "Source",
            cols(&["id", "D-EXP"]),
            vec![vec![1.0.into(), "06/10/2025".into()]],
        );
        let month = Table::with_rows(
            "month",
            cols(&["id", "d-exp"]),
            vec![
                vec![1.0.into(), CellValue::Date(ymd(2025, 6, 10))],
                vec![2.0.into(), CellValue::Missing],
            ],
        );

        let out = normalize_tables(&source, &month, &DateConfig::default()).unwrap();
        assert_eq!(out.source_expiry, "D-EXP");
        assert_eq!(out.month_expiry, "d-exp");
        assert_eq!(out.month_warning, "d-warn");
        assert!(out.diagnostics.is_empty());

        assert_eq!(out.source.get(0, 1), Some(&CellValue::from("2025-06-10")));
        assert_eq!(out.month.columns(), cols(&["id", "d-exp", "d-warn"]).as_slice());
        assert_eq!(out.month.get(0, 1), Some(&CellValue::from("2025-06-10")));
        assert_eq!(out.month.get(0, 2), Some(&CellValue::from("2025-06-08")));
        assert_eq!(out.month.get(1, 2), Some(&CellValue::Missing));

        // Inputs untouched
        assert_eq!(month.column_count(), 2);
        assert_eq!(source.get(0, 1), Some(&CellValue::from("06/10/2025")));
    }

    #[test]
    fn normalize_overwrites_stale_warning_column() {
        let source = Table::with_rows("Source", cols(&["d-exp"]), vec![vec!["2025-06-10".into()]]);
        let month = Table::with_rows(
            "month",
            cols(&["D-Warn", "d-exp"]),
            vec![vec!["1999-01-01".into(), "2025-06-10".into()]],
        );
        let out = normalize_tables(&source, &month, &DateConfig::default()).unwrap();
        assert_eq!(out.month_warning, "D-Warn");
        assert_eq!(out.month.column_count(), 2);
        assert_eq!(out.month.get(0, 0), Some(&CellValue::from("2025-06-08")));
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::WarningColumnOverwritten {
                table: "month".into(),
                column: "D-Warn".into(),
            }]
        );
    }

    #[test]
    fn missing_expiry_column_is_fatal() {
        let source = Table::with_rows("Source", cols(&["id"]), vec![vec![1.0.into()]]);
        let month = Table::with_rows("month", cols(&["d-exp"]), vec![vec!["2025-06-10".into()]]);
        let err = normalize_tables(&source, &month, &DateConfig::default()).unwrap_err();
        assert!(
            matches!(err, ReconError::MissingColumn { ref table, ref column } if table == "Source" && column == "d-exp"),
            "{err}"
        );
    }

    #[test]
    fn unparseable_expiry_reports_row() {
        let source = Table::with_rows("Source", cols(&["d-exp"]), vec![vec!["2025-06-10".into()]]);
        let month = Table::with_rows(
            "month",
            cols(&["d-exp"]),
            vec![vec!["2025-06-10".into()], vec!["tomorrow".into()]],
        );
        let err = normalize_tables(&source, &month, &DateConfig::default()).unwrap_err();
        match err {
            ReconError::DateParse { table, column, row, value } => {
                assert_eq!(table, "month");
                assert_eq!(column, "d-exp");
                assert_eq!(row, 2);
                assert_eq!(value, "tomorrow");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn custom_offset() {
        let source = Table::with_rows("Source", cols(&["d-exp"]), vec![vec!["2025-01-10".into()]]);
        let month = source.clone().renamed("month");
        let config = DateConfig { warning_offset_days: 30, ..DateConfig::default() };
        let out = normalize_tables(&source, &month, &config).unwrap();
        assert_eq!(out.month.get(0, 1), Some(&CellValue::from("2024-12-11")));
    }
}
