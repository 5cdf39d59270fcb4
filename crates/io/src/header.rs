//! Header row handling shared by every tabular reader.

use std::collections::HashSet;

use certwatch_recon::{CellValue, Table};

/// Turn raw header cells into unique column names.
///
/// Blank cells become `Unnamed: <index>`. An exact repeat of an earlier name
/// gets `.1`, `.2`, ... appended until it is unique. Names differing only in
/// case are left alone; the engine reports those itself.
pub fn column_names(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());

    for (i, cell) in raw.iter().enumerate() {
        let base = match cell.trim() {
            "" => format!("Unnamed: {i}"),
            _ => cell.clone(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

/// Build a table from a grid whose first row is the header.
///
/// Trailing all-empty rows are dropped.
pub fn table_from_grid(name: &str, mut grid: Vec<Vec<CellValue>>) -> Table {
    if grid.is_empty() {
        return Table::new(name, Vec::new());
    }
    let header: Vec<String> = grid.remove(0).iter().map(CellValue::display).collect();
    while grid.last().is_some_and(|row| row.iter().all(CellValue::is_missing)) {
        grid.pop();
    }
    Table::with_rows(name, column_names(&header), grid)
}
