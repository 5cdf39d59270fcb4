// File I/O: workbook and CSV directory sources, workbook sink

pub mod csv;
pub mod header;
pub mod xlsx;

use std::path::Path;

use certwatch_recon::{ReconError, TableSource};

pub use crate::csv::CsvDirSource;
pub use crate::xlsx::{XlsxSink, XlsxSource};

/// Open `path` as a table source.
///
/// A directory is read as one `<sheet>.csv` file per table; anything else is
/// opened as a workbook (xlsx, xls, xlsb, ods).
pub fn open_source(path: &Path) -> Result<Box<dyn TableSource>, ReconError> {
    if !path.exists() {
        return Err(ReconError::MissingInput(path.display().to_string()));
    }
    if path.is_dir() {
        Ok(Box::new(CsvDirSource::open(path)?))
    } else {
        Ok(Box::new(XlsxSource::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_source(&dir.path().join("nope.xlsx")).err().unwrap();
        assert!(matches!(err, ReconError::MissingInput(_)));
    }

    #[test]
    fn directory_opens_as_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Source.csv"), "id\n1\n").unwrap();
        let src = open_source(dir.path()).unwrap();
        assert_eq!(src.table_names(), ["Source"]);
    }
}
