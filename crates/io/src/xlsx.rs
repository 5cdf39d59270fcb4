// Excel workbook source (xlsx, xls, xlsb, ods) and report sink (xlsx only)
//
// Source: the first row of each sheet's used range is the header.
// Sink: the whole workbook is serialized in memory, written to a temp file
//       next to the target, then renamed over it.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use certwatch_recon::dates::{from_serial_datetime, to_serial};
use certwatch_recon::{CellValue, ReconError, ReportBundle, ReportSink, Table, TableSource};
use log::{debug, info};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use crate::header::table_from_grid;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Largest sheet a writer can produce.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct XlsxSource {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl XlsxSource {
    pub fn open(path: &Path) -> Result<Self, ReconError> {
        if !path.exists() {
            return Err(ReconError::MissingInput(path.display().to_string()));
        }
        let workbook = open_workbook_auto(path)
            .map_err(|e| ReconError::Io(format!("failed to open {}: {}", path.display(), e)))?;
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }
}

impl TableSource for XlsxSource {
    fn table_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    fn read_table(&mut self, name: &str) -> Result<Table, ReconError> {
        let names = self.table_names();
        if !names.iter().any(|n| n == name) {
            return Err(ReconError::MissingSheet {
                sheet: name.to_string(),
                available: names,
            });
        }

        let range = self.workbook.worksheet_range(name).map_err(|e| {
            ReconError::Io(format!("{}: failed to read sheet '{}': {}", self.path.display(), name, e))
        })?;
        let (height, width) = range.get_size();
        debug!("sheet '{}': {}x{} used range", name, height, width);

        let grid = range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();
        Ok(table_from_grid(name, grid))
    }
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Missing,
        Data::String(s) if s.is_empty() => CellValue::Missing,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            // 1900 date system assumed
            let serial = dt.as_f64();
            match from_serial_datetime(serial) {
                Some(v) if serial.fract() == 0.0 => CellValue::Date(v.date()),
                Some(v) => CellValue::DateTime(v),
                None => CellValue::Number(serial),
            }
        }
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Writes a report bundle as one xlsx workbook, all or nothing.
#[derive(Debug, Clone)]
pub struct XlsxSink {
    path: PathBuf,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for XlsxSink {
    fn write_bundle(&mut self, bundle: &ReportBundle) -> Result<(), ReconError> {
        let bytes = render_workbook(bundle)?;
        write_atomic(&self.path, &bytes)?;
        info!("saved {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }
}

/// Serialize a bundle to xlsx bytes. One worksheet per table, bold header row.
pub fn render_workbook(bundle: &ReportBundle) -> Result<Vec<u8>, ReconError> {
    let mut workbook = XlsxWorkbook::new();

    for table in &bundle.sheets {
        let worksheet = workbook
            .add_worksheet()
            .set_name(table.name())
            .map_err(|e| ReconError::Write(format!("failed to create sheet '{}': {}", table.name(), e)))?;
        write_table(worksheet, table)?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ReconError::Write(format!("failed to serialize workbook: {}", e)))
}

fn write_table(worksheet: &mut Worksheet, table: &Table) -> Result<(), ReconError> {
    if table.row_count() + 1 > MAX_ROWS || table.column_count() > MAX_COLS {
        return Err(ReconError::Write(format!(
            "sheet '{}' is {}x{}, larger than a worksheet allows",
            table.name(),
            table.row_count() + 1,
            table.column_count()
        )));
    }

    let bold = Format::new().set_bold();
    let date = Format::new().set_num_format(DATE_FORMAT);
    let datetime = Format::new().set_num_format(DATETIME_FORMAT);
    let fail = |row: usize, col: usize, e: rust_xlsxwriter::XlsxError| {
        ReconError::Write(format!("sheet '{}', cell ({}, {}): {}", table.name(), row, col, e))
    };

    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &bold)
            .map_err(|e| fail(0, col, e))?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let row32 = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            let written = match cell {
                CellValue::Missing => continue,
                CellValue::Text(s) if s.is_empty() => continue,
                CellValue::Text(s) => worksheet.write_string(row32, col16, s),
                CellValue::Number(n) => worksheet.write_number(row32, col16, *n),
                CellValue::Bool(b) => worksheet.write_boolean(row32, col16, *b),
                CellValue::Date(d) => match d.and_hms_opt(0, 0, 0) {
                    Some(dt) => worksheet.write_number_with_format(row32, col16, to_serial(dt), &date),
                    None => continue,
                },
                CellValue::DateTime(dt) => {
                    worksheet.write_number_with_format(row32, col16, to_serial(*dt), &datetime)
                }
            };
            written.map_err(|e| fail(r + 1, col, e))?;
        }
    }

    worksheet.autofit();
    Ok(())
}

/// Replace `path` with `bytes` via a temp file in the same directory, so a
/// failure never leaves a partial file behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReconError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let err = |e: std::io::Error| ReconError::Write(format!("{}: {}", path.display(), e));

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(err)?;
    tmp.write_all(bytes).map_err(err)?;
    tmp.as_file().sync_all().map_err(err)?;
    tmp.persist(path).map_err(|e| err(e.error))?;
    Ok(())
}
