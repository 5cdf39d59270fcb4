use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// Excel's sheet name length limit.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Commented default config written by `certwatch init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# certwatch reconciliation config
name = "certification expiry check"

[input]
# Workbook (.xlsx/.xls/.xlsb/.ods) or a directory of <sheet>.csv files.
# Relative paths resolve against this file's directory.
path = "data.xlsx"
source_sheet = "Source"
month_sheet = "month"

[output]
path = "data_Results.xlsx"
source_sheet = "Source"
month_sheet = "month (Updated)"
issues_sheet = "issues"
month_columns = ["id", "d-warn", "first_name", "last_name", "email", "d-exp", "ok-id"]

[dates]
expiry_column = "d-exp"
warning_column = "d-warn"
warning_offset_days = 2
"#;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconConfig {
    pub name: String,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub dates: DateConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: "certification expiry check".into(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            dates: DateConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
    pub source_sheet: String,
    pub month_sheet: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "data.xlsx".into(),
            source_sheet: "Source".into(),
            month_sheet: "month".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub source_sheet: String,
    pub month_sheet: String,
    pub issues_sheet: String,
    /// Logical column order of the updated month sheet.
    pub month_columns: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "data_Results.xlsx".into(),
            source_sheet: "Source".into(),
            month_sheet: "month (Updated)".into(),
            issues_sheet: "issues".into(),
            month_columns: ["id", "d-warn", "first_name", "last_name", "email", "d-exp", "ok-id"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DateConfig {
    pub expiry_column: String,
    pub warning_column: String,
    pub warning_offset_days: u32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            expiry_column: "d-exp".into(),
            warning_column: "d-warn".into(),
            warning_offset_days: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(s: &str) -> Result<Self, ReconError> {
        let config: Self = toml::from_str(s).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let invalid = |msg: String| Err(ReconError::ConfigValidation(msg));

        for (field, value) in [
            ("input.path", &self.input.path),
            ("input.source_sheet", &self.input.source_sheet),
            ("input.month_sheet", &self.input.month_sheet),
            ("output.path", &self.output.path),
            ("dates.expiry_column", &self.dates.expiry_column),
            ("dates.warning_column", &self.dates.warning_column),
        ] {
            if value.trim().is_empty() {
                return invalid(format!("{field} must not be empty"));
            }
        }

        if self.input.source_sheet == self.input.month_sheet {
            return invalid(format!(
                "input.source_sheet and input.month_sheet are both '{}'",
                self.input.source_sheet
            ));
        }

        let sheets = [
            ("output.source_sheet", &self.output.source_sheet),
            ("output.month_sheet", &self.output.month_sheet),
            ("output.issues_sheet", &self.output.issues_sheet),
        ];
        for (field, name) in sheets {
            check_sheet_name(field, name)?;
        }
        for (i, (field_a, a)) in sheets.iter().enumerate() {
            for (field_b, b) in &sheets[i + 1..] {
                if a.to_lowercase() == b.to_lowercase() {
                    return invalid(format!("{field_a} and {field_b} both name sheet '{a}'"));
                }
            }
        }

        if self.dates.expiry_column.to_lowercase() == self.dates.warning_column.to_lowercase() {
            return invalid("dates.expiry_column and dates.warning_column must differ".into());
        }

        if self.output.month_columns.is_empty() {
            return invalid("output.month_columns must list at least one column".into());
        }
        let mut seen = std::collections::HashSet::new();
        for col in &self.output.month_columns {
            if col.trim().is_empty() {
                return invalid("output.month_columns contains an empty name".into());
            }
            if !seen.insert(col.to_lowercase()) {
                return invalid(format!("output.month_columns lists '{col}' twice"));
            }
        }

        Ok(())
    }
}

fn check_sheet_name(field: &str, name: &str) -> Result<(), ReconError> {
    if name.trim().is_empty() {
        return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(ReconError::ConfigValidation(format!(
            "{field} '{name}' exceeds {MAX_SHEET_NAME_LEN} characters"
        )));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
        return Err(ReconError::ConfigValidation(format!(
            "{field} '{name}' contains forbidden character '{c}'"
        )));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(ReconError::ConfigValidation(format!(
            "{field} '{name}' must not start or end with an apostrophe"
        )));
    }
    Ok(())
}
