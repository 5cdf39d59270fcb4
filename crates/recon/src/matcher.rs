use std::collections::{HashMap, VecDeque};

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::resolve::ColumnResolver;
use crate::table::{CellValue, Table};

// ---------------------------------------------------------------------------
// Join keys
// ---------------------------------------------------------------------------

/// A column shared by both tables, identified case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchKey {
    /// Name as spelled in the left (source) table.
    pub name: String,
    #[serde(skip)]
    pub left_index: usize,
    #[serde(skip)]
    pub right_index: usize,
}

/// Columns common to both schemas, in left schema order.
///
/// A name that appears several times (case-insensitively) in one schema
/// only contributes its first occurrence.
pub fn match_keys(left: &[String], right: &[String]) -> Vec<MatchKey> {
    let left_cols = ColumnResolver::new(left);
    let right_cols = ColumnResolver::new(right);
    left.iter()
        .enumerate()
        .filter(|(i, name)| left_cols.index_of(name) == Some(*i))
        .filter_map(|(left_index, name)| {
            right_cols.index_of(name).map(|right_index| MatchKey {
                name: name.clone(),
                left_index,
                right_index,
            })
        })
        .collect()
}

/// Hashable, type-aware image of one cell.
///
/// Numbers compare by value (`-0.0 == 0.0`), text compares exactly, and two
/// missing values are equal. Values of different kinds never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyAtom {
    Missing,
    Text(String),
    Number(OrderedFloat<f64>),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl From<&CellValue> for KeyAtom {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Missing => Self::Missing,
            CellValue::Text(s) => Self::Text(s.clone()),
            CellValue::Number(n) => Self::Number(OrderedFloat(if *n == 0.0 { 0.0 } else { *n })),
            CellValue::Bool(b) => Self::Bool(*b),
            CellValue::Date(d) => Self::Date(*d),
            CellValue::DateTime(dt) => Self::DateTime(*dt),
        }
    }
}

type RowKey = Vec<KeyAtom>;

fn row_key(row: &[CellValue], indices: impl Iterator<Item = usize>) -> RowKey {
    indices
        .map(|i| row.get(i).map_or(KeyAtom::Missing, KeyAtom::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Outer join
// ---------------------------------------------------------------------------

/// Where a joined row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOrigin {
    MatchedBoth,
    OnlyLeft,
    OnlyRight,
}

impl std::fmt::Display for JoinOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchedBoth => write!(f, "both"),
            Self::OnlyLeft => write!(f, "left_only"),
            Self::OnlyRight => write!(f, "right_only"),
        }
    }
}

/// One row of the outer join, pointing back into the input tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinedRow {
    MatchedBoth { left: usize, right: usize },
    OnlyLeft { left: usize },
    OnlyRight { right: usize },
}

impl JoinedRow {
    pub fn origin(&self) -> JoinOrigin {
        match self {
            Self::MatchedBoth { .. } => JoinOrigin::MatchedBoth,
            Self::OnlyLeft { .. } => JoinOrigin::OnlyLeft,
            Self::OnlyRight { .. } => JoinOrigin::OnlyRight,
        }
    }

    pub fn is_issue(&self) -> bool {
        !matches!(self, Self::MatchedBoth { .. })
    }
}

#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub keys: Vec<MatchKey>,
    /// Matched pairs in left row order, then left-only rows in left row
    /// order, then right-only rows in right row order.
    pub rows: Vec<JoinedRow>,
}

impl JoinOutput {
    pub fn count(&self, origin: JoinOrigin) -> usize {
        self.rows.iter().filter(|r| r.origin() == origin).count()
    }

    pub fn issues(&self) -> impl Iterator<Item = &JoinedRow> {
        self.rows.iter().filter(|r| r.is_issue())
    }
}

/// Multiplicity-sensitive full outer join on every shared column.
///
/// Rows with equal key values pair up in input order; when one side holds
/// more occurrences of a key than the other, the excess rows come out as
/// `OnlyLeft` / `OnlyRight`. With no shared columns every row carries the
/// same (empty) key, so rows pair purely by position.
pub fn outer_join(left: &Table, right: &Table) -> JoinOutput {
    let keys = match_keys(left.columns(), right.columns());
    if keys.is_empty() {
        warn!(
            "tables '{}' and '{}' share no columns; rows pair by position only",
            left.name(),
            right.name()
        );
    }

    let mut pending: HashMap<RowKey, VecDeque<usize>> = HashMap::new();
    for (ri, row) in right.rows().iter().enumerate() {
        pending
            .entry(row_key(row, keys.iter().map(|k| k.right_index)))
            .or_default()
            .push_back(ri);
    }

    let mut matched = Vec::new();
    let mut left_only = Vec::new();
    let mut right_used = vec![false; right.row_count()];

    for (li, row) in left.rows().iter().enumerate() {
        let key = row_key(row, keys.iter().map(|k| k.left_index));
        match pending.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(ri) => {
                right_used[ri] = true;
                matched.push(JoinedRow::MatchedBoth { left: li, right: ri });
            }
            None => left_only.push(JoinedRow::OnlyLeft { left: li }),
        }
    }

    let right_only = right_used
        .iter()
        .enumerate()
        .filter(|(_, used)| !**used)
        .map(|(ri, _)| JoinedRow::OnlyRight { right: ri });

    let mut rows = matched;
    rows.extend(left_only);
    rows.extend(right_only);

    debug!(
        "outer join '{}' x '{}' on {} key(s): {} rows",
        left.name(),
        right.name(),
        keys.len(),
        rows.len()
    );

    JoinOutput { keys, rows }
}

// ---------------------------------------------------------------------------
// Merged layout
// ---------------------------------------------------------------------------

/// Where one merged column takes its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergedSource {
    /// Shared column: left value, or right value for right-only rows.
    Key { left: usize, right: usize },
    LeftOnly(usize),
    RightOnly(usize),
}

/// Merged column layout: all left columns (left order and spelling)
/// followed by the right columns that are not join keys.
fn merged_layout(left: &Table, right: &Table, keys: &[MatchKey]) -> Vec<(String, MergedSource)> {
    let mut layout: Vec<(String, MergedSource)> = left
        .columns()
        .iter()
        .enumerate()
        .map(|(li, name)| {
            let source = keys
                .iter()
                .find(|k| k.left_index == li)
                .map_or(MergedSource::LeftOnly(li), |k| MergedSource::Key {
                    left: li,
                    right: k.right_index,
                });
            (name.clone(), source)
        })
        .collect();

    layout.extend(
        right
            .columns()
            .iter()
            .enumerate()
            .filter(|(ri, _)| !keys.iter().any(|k| k.right_index == *ri))
            .map(|(ri, name)| (name.clone(), MergedSource::RightOnly(ri))),
    );
    layout
}

/// Render joined rows in the merged layout. Values from the absent side are
/// filled with empty text; missing values on the present side are filled
/// the same way.
pub fn merged_table(
    name: &str,
    left: &Table,
    right: &Table,
    keys: &[MatchKey],
    rows: impl IntoIterator<Item = JoinedRow>,
) -> Table {
    let layout = merged_layout(left, right, keys);
    let columns = layout.iter().map(|(n, _)| n.clone()).collect();
    let mut table = Table::new(name, columns);

    let cell = |t: &Table, r: Option<usize>, c: usize| -> CellValue {
        r.and_then(|r| t.get(r, c)).cloned().unwrap_or(CellValue::Missing)
    };

    for joined in rows {
        let (l, r) = match joined {
            JoinedRow::MatchedBoth { left, right } => (Some(left), Some(right)),
            JoinedRow::OnlyLeft { left } => (Some(left), None),
            JoinedRow::OnlyRight { right } => (None, Some(right)),
        };
        let values = layout
            .iter()
            .map(|(_, src)| {
                let v = match *src {
                    MergedSource::Key { left: lc, right: rc } => match l {
                        Some(_) => cell(left, l, lc),
                        None => cell(right, r, rc),
                    },
                    MergedSource::LeftOnly(c) => cell(left, l, c),
                    MergedSource::RightOnly(c) => cell(right, r, c),
                };
                v.filled()
            })
            .collect();
        table.push_row(values);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table(name: &str, columns: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
        Table::with_rows(name, cols(columns), rows)
    }

    #[test]
    fn keys_use_left_spelling_and_order() {
        let keys = match_keys(&cols(&["ID", "d-exp", "note"]), &cols(&["D-EXP", "extra", "id"]));
        let names: Vec<&str> = keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["ID", "d-exp"]);
        assert_eq!((keys[0].left_index, keys[0].right_index), (0, 2));
        assert_eq!((keys[1].left_index, keys[1].right_index), (1, 0));
    }

    #[test]
    fn keys_skip_case_duplicates() {
        let keys = match_keys(&cols(&["Email", "EMAIL"]), &cols(&["email"]));
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "Email");
    }

    #[test]
    fn exact_match_and_one_sided_rows() {
        let left = table(
            "Source",
            &["id", "d-exp"],
            vec![
                vec![1.0.into(), "2025-06-10".into()],
                vec![2.0.into(), "2025-06-10".into()],
            ],
        );
        let right = table(
            "month",
            &["ID", "d-exp"],
            vec![
                vec![1.0.into(), "2025-06-10".into()],
                vec![3.0.into(), "2025-07-01".into()],
            ],
        );
        let out = outer_join(&left, &right);
        assert_eq!(
            out.rows,
            vec![
                JoinedRow::MatchedBoth { left: 0, right: 0 },
                JoinedRow::OnlyLeft { left: 1 },
                JoinedRow::OnlyRight { right: 1 },
            ]
        );
        assert_eq!(out.count(JoinOrigin::MatchedBoth), 1);
        assert_eq!(out.issues().count(), 2);
    }

    #[test]
    fn numbers_compare_by_value_not_type() {
        let left = table("l", &["id"], vec![vec![1.0.into()], vec!["1".into()]]);
        let right = table("r", &["id"], vec![vec![CellValue::Number(1.0)]]);
        let out = outer_join(&left, &right);
        assert_eq!(out.count(JoinOrigin::MatchedBoth), 1);
        // Text "1" is not the number 1
        assert_eq!(out.rows[1], JoinedRow::OnlyLeft { left: 1 });
    }

    #[test]
    fn missing_matches_missing_but_not_empty_text() {
        let left = table("l", &["id", "x"], vec![vec![1.0.into(), CellValue::Missing]]);
        let right = table(
            "r",
            &["id", "x"],
            vec![vec![1.0.into(), CellValue::Missing], vec![1.0.into(), "".into()]],
        );
        let out = outer_join(&left, &right);
        assert_eq!(out.rows[0], JoinedRow::MatchedBoth { left: 0, right: 0 });
        assert_eq!(out.rows[1], JoinedRow::OnlyRight { right: 1 });
    }

    #[test]
    fn duplicates_are_count_sensitive() {
        let left = table("l", &["id"], vec![vec![7.0.into()], vec![7.0.into()], vec![7.0.into()]]);
        let right = table("r", &["id"], vec![vec![7.0.into()]]);
        let out = outer_join(&left, &right);
        assert_eq!(out.count(JoinOrigin::MatchedBoth), 1);
        assert_eq!(out.count(JoinOrigin::OnlyLeft), 2);
        assert_eq!(
            out.rows,
            vec![
                JoinedRow::MatchedBoth { left: 0, right: 0 },
                JoinedRow::OnlyLeft { left: 1 },
                JoinedRow::OnlyLeft { left: 2 },
            ]
        );
    }

    #[test]
    fn no_shared_columns_pairs_by_position() {
        let left = table("l", &["a"], vec![vec![1.0.into()], vec![2.0.into()]]);
        let right = table("r", &["b"], vec![vec![9.0.into()]]);
        let out = outer_join(&left, &right);
        assert!(out.keys.is_empty());
        assert_eq!(out.count(JoinOrigin::MatchedBoth), 1);
        assert_eq!(out.count(JoinOrigin::OnlyLeft), 1);
    }

    #[test]
    fn merged_table_fills_absent_side() {
        let left = table(
            "Source",
            &["id", "d-exp", "note"],
            vec![vec![2.0.into(), "2025-06-10".into(), "vip".into()]],
        );
        let right = table(
            "month",
            &["d-exp", "ID", "ok-id"],
            vec![vec!["2025-07-01".into(), 3.0.into(), CellValue::Missing]],
        );
        let out = outer_join(&left, &right);
        let merged = merged_table("issues", &left, &right, &out.keys, out.issues().copied());

        assert_eq!(merged.columns(), cols(&["id", "d-exp", "note", "ok-id"]).as_slice());
        let first: Vec<CellValue> = vec![2.0.into(), "2025-06-10".into(), "vip".into(), "".into()];
        assert_eq!(merged.rows()[0], first);
        // Right-only row: keys come from the right side, left-only columns are empty
        let second: Vec<CellValue> = vec![3.0.into(), "2025-07-01".into(), "".into(), "".into()];
        assert_eq!(merged.rows()[1], second);
    }
}
