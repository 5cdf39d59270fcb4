//! Case-insensitive column lookup.
//!
//! Column names are compared with Unicode lowercasing and no trimming. When
//! a schema holds several names that fold to the same lowercase form, the
//! first one (leftmost) wins; [`ColumnResolver::ambiguous`] reports such
//! groups so the caller can surface them.

use std::collections::HashMap;
use std::fmt;

/// The requested column has no case-insensitive match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub name: String,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no column matching '{}'", self.name)
    }
}

impl std::error::Error for NotFound {}

/// Resolve `name` against `schema`, returning the name as spelled in the schema.
pub fn resolve_column<'a>(schema: &'a [String], name: &str) -> Result<&'a str, NotFound> {
    ColumnResolver::new(schema).resolve(name).map(|(_, actual)| actual)
}

/// Outcome of mapping a logical column name onto a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Found { index: usize, name: &'a str },
    /// No match; callers fall back to the logical name.
    Gap { name: &'a str },
}

impl<'a> Resolution<'a> {
    /// The header to use in output: the schema spelling, or the logical name.
    pub fn output_name(&self) -> &'a str {
        match self {
            Self::Found { name, .. } | Self::Gap { name } => name,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Found { index, .. } => Some(*index),
            Self::Gap { .. } => None,
        }
    }
}

/// Lowercase index over one schema, built once and queried many times.
pub struct ColumnResolver<'a> {
    schema: &'a [String],
    by_lower: HashMap<String, usize>,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(schema: &'a [String]) -> Self {
        let mut by_lower = HashMap::with_capacity(schema.len());
        for (i, col) in schema.iter().enumerate() {
            by_lower.entry(col.to_lowercase()).or_insert(i);
        }
        Self { schema, by_lower }
    }

    pub fn schema(&self) -> &'a [String] {
        self.schema
    }

    /// Position and spelling of the first case-insensitive match.
    pub fn resolve(&self, name: &str) -> Result<(usize, &'a str), NotFound> {
        self.by_lower
            .get(&name.to_lowercase())
            .map(|&i| (i, self.schema[i].as_str()))
            .ok_or_else(|| NotFound { name: name.to_string() })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.resolve(name).ok().map(|(i, _)| i)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_lower.contains_key(&name.to_lowercase())
    }

    /// Best-effort mapping: the schema spelling when present, otherwise a gap
    /// carrying the logical name.
    pub fn map_logical<'n>(&self, logical: &'n str) -> Resolution<'n>
    where
        'a: 'n,
    {
        match self.resolve(logical) {
            Ok((index, name)) => Resolution::Found { index, name },
            Err(_) => Resolution::Gap { name: logical },
        }
    }

    /// Groups of schema names that collide case-insensitively, in schema order.
    pub fn ambiguous(&self) -> Vec<Vec<&'a str>> {
        let mut groups: Vec<Vec<&'a str>> = Vec::new();
        let mut group_of: HashMap<String, usize> = HashMap::new();
        for col in self.schema {
            let key = col.to_lowercase();
            match group_of.get(&key) {
                Some(&g) => groups[g].push(col.as_str()),
                None => {
                    group_of.insert(key, groups.len());
                    groups.push(vec![col.as_str()]);
                }
            }
        }
        groups.retain(|g| g.len() > 1);
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_any_casing_to_schema_spelling() {
        let s = schema(&["id", "D-Exp", "email"]);
        for probe in ["D-EXP", "d-exp", "D-Exp"] {
            assert_eq!(resolve_column(&s, probe), Ok("D-Exp"));
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let s = schema(&["ID", "Email"]);
        let once = resolve_column(&s, "email").unwrap();
        let twice = resolve_column(&s, once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn not_found() {
        let s = schema(&["id"]);
        let err = resolve_column(&s, "d-exp").unwrap_err();
        assert_eq!(err.name, "d-exp");
        assert_eq!(err.to_string(), "no column matching 'd-exp'");
    }

    #[test]
    fn first_match_wins_on_collision() {
        let s = schema(&["Email", "id", "EMAIL"]);
        let r = ColumnResolver::new(&s);
        assert_eq!(r.resolve("email"), Ok((0, "Email")));
        assert_eq!(r.ambiguous(), vec![vec!["Email", "EMAIL"]]);
    }

    #[test]
    fn no_ambiguity_in_clean_schema() {
        let s = schema(&["id", "email"]);
        assert!(ColumnResolver::new(&s).ambiguous().is_empty());
    }

    #[test]
    fn logical_mapping_falls_back_to_logical_name() {
        let s = schema(&["ID", "First_Name"]);
        let r = ColumnResolver::new(&s);
        assert_eq!(r.map_logical("id"), Resolution::Found { index: 0, name: "ID" });
        let gap = r.map_logical("ok-id");
        assert_eq!(gap, Resolution::Gap { name: "ok-id" });
        assert_eq!(gap.output_name(), "ok-id");
        assert_eq!(gap.index(), None);
    }

    #[test]
    fn unicode_lowercasing() {
        let s = schema(&["STRASSE", "Ärztin"]);
        assert_eq!(resolve_column(&s, "ärztin"), Ok("Ärztin"));
    }
}
