use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Matching policy
// ---------------------------------------------------------------------------

/// Thresholds used by the matching layers.
///
/// These are fixed policy: the run file never sets them, and
/// `MatchConfig::default()` is what every production run uses. Tests build
/// other values directly.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Fuzzy layer accepts a description score strictly above this (0-100).
    pub fuzzy_threshold: u8,
    /// Aggregate layer: relative part of `|bank - sum| <= abs + rel * |sum|`.
    pub amount_rel_tol: f64,
    /// Aggregate layer: absolute part of the tolerance.
    pub amount_abs_tol: f64,
    /// Report flags the variance when `|gl_total - bank_total|` exceeds this.
    pub variance_epsilon: f64,
}

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;
pub const DEFAULT_AMOUNT_REL_TOL: f64 = 1e-5;
pub const DEFAULT_AMOUNT_ABS_TOL: f64 = 1e-8;
pub const DEFAULT_VARIANCE_EPSILON: f64 = 0.01;

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            amount_rel_tol: DEFAULT_AMOUNT_REL_TOL,
            amount_abs_tol: DEFAULT_AMOUNT_ABS_TOL,
            variance_epsilon: DEFAULT_VARIANCE_EPSILON,
        }
    }
}

impl MatchConfig {
    /// Tolerance equality used by the aggregate layer.
    pub fn amounts_close(&self, bank_amount: f64, gl_sum: f64) -> bool {
        (bank_amount - gl_sum).abs() <= self.amount_abs_tol + self.amount_rel_tol * gl_sum.abs()
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.fuzzy_threshold > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "fuzzy_threshold must be 0-100, got {}",
                self.fuzzy_threshold
            )));
        }
        for (name, value) in [
            ("amount_rel_tol", self.amount_rel_tol),
            ("amount_abs_tol", self.amount_abs_tol),
            ("variance_epsilon", self.variance_epsilon),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Run config (TOML)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    pub gl: SourceConfig,
    pub bank: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: String,
    #[serde(default)]
    pub columns: ColumnMapping,
    /// chrono format strings tried in order. Empty means the built-in list.
    #[serde(default)]
    pub date_formats: Vec<String>,
}

impl SourceConfig {
    pub fn for_file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            columns: ColumnMapping::default(),
            date_formats: Vec::new(),
        }
    }

    pub fn format(&self) -> InputFormat {
        if self.file.to_ascii_lowercase().ends_with(".json") {
            InputFormat::Json
        } else {
            InputFormat::Csv
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

/// Canonical (lower_snake) header names for each field.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default = "default_date")]
    pub date: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_amount")]
    pub amount: String,
    /// Debit/credit indicator column, if the source carries unsigned amounts.
    #[serde(default)]
    pub dr_cr: Option<String>,
}

fn default_id() -> String {
    "uid".into()
}

fn default_date() -> String {
    "date".into()
}

fn default_description() -> String {
    "desc".into()
}

fn default_amount() -> String {
    "amount".into()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: default_id(),
            date: default_date(),
            description: default_description(),
            amount: default_amount(),
            dr_cr: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub xlsx: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        for (label, source) in [("gl", &self.gl), ("bank", &self.bank)] {
            if source.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("[{label}] file must not be empty")));
            }

            let cols = &source.columns;
            let mut names = vec![&cols.id, &cols.date, &cols.description, &cols.amount];
            if let Some(ref dr_cr) = cols.dr_cr {
                names.push(dr_cr);
            }
            for (i, name) in names.iter().enumerate() {
                if name.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "[{label}.columns] column names must not be empty"
                    )));
                }
                if names[..i].contains(name) {
                    return Err(ReconError::ConfigValidation(format!(
                        "[{label}.columns] column '{name}' is mapped twice"
                    )));
                }
            }

            if source.date_formats.iter().any(|f| f.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "[{label}] date_formats must not contain empty entries"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
