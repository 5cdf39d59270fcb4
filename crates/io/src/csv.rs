// CSV directory source: one `<table>.csv` file per table

use std::path::{Path, PathBuf};

use certwatch_recon::{CellValue, ReconError, Table, TableSource};
use log::debug;

use crate::header::table_from_grid;

/// A directory treated as a workbook: every `*.csv` file is one table, named
/// after its file stem.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
    names: Vec<String>,
}

impl CsvDirSource {
    pub fn open(dir: &Path) -> Result<Self, ReconError> {
        if !dir.is_dir() {
            return Err(ReconError::MissingInput(dir.display().to_string()));
        }
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ReconError::Io(format!("{}: {}", dir.display(), e)))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ReconError::Io(format!("{}: {}", dir.display(), e)))?
                .path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        // Exact stem match; only the extension is case-insensitive
        std::fs::read_dir(&self.dir).ok()?.filter_map(Result::ok).map(|e| e.path()).find(|p| {
            p.file_stem().and_then(|s| s.to_str()) == Some(name)
                && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
    }
}

impl TableSource for CsvDirSource {
    fn table_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read_table(&mut self, name: &str) -> Result<Table, ReconError> {
        let path = self.path_for(name).ok_or_else(|| ReconError::MissingSheet {
            sheet: name.to_string(),
            available: self.table_names(),
        })?;
        let content = read_file_as_utf8(&path)?;
        let delimiter = sniff_delimiter(&content);
        debug!("reading {} with delimiter {:?}", path.display(), delimiter as char);
        import_from_string(name, &content, delimiter)
            .map_err(|e| ReconError::Io(format!("{}: {}", path.display(), e)))
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (comma, semicolon, tab, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = match counts.first() {
            Some(&n) if n > 1 => n,
            _ => continue,
        };
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read a file as UTF-8, dropping a leading BOM. Falls back to Windows-1252
/// (common for Excel-exported CSVs) when the bytes are not valid UTF-8.
pub fn read_file_as_utf8(path: &Path) -> Result<String, ReconError> {
    let bytes = std::fs::read(path).map_err(|e| ReconError::Io(format!("{}: {}", path.display(), e)))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn import_from_string(name: &str, content: &str, delimiter: u8) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result?;
        grid.push(
            record
                .iter()
                .map(|field| match field {
                    "" => CellValue::Missing,
                    s => CellValue::from(s),
                })
                .collect(),
        );
    }
    Ok(table_from_grid(name, grid))
}
