//! Raw CSV/JSON rows to canonical [`Record`]s.
//!
//! Loosely-typed values exist only here, as [`RawValue`]. Everything past
//! [`normalize_rows`] sees finite amounts, uppercased descriptions and
//! optional dates.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::SourceConfig;
use crate::error::ReconError;
use crate::model::{Record, Side};

/// Formats tried when a source does not configure its own.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%b %d, %Y",
];

/// Years outside this range are treated as unparseable. chrono's `%Y`
/// accepts a two-digit year verbatim, so `1/5/26` would otherwise be year 26.
pub const DATE_YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=9999;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Empty,
}

impl RawValue {
    /// CSV fields are always text; blank means empty.
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(field.to_string())
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Empty,
            Value::String(s) => Self::from_field(s),
            Value::Number(n) => n.as_f64().map_or(Self::Empty, Self::Number),
            other => Self::Text(other.to_string()),
        }
    }

    /// Text rendering, trimmed. `None` for empty values.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Self::Number(n) => Some(n.to_string()),
            Self::Empty => None,
        }
    }
}

/// A header row plus data rows aligned to it. Headers are canonical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// An input row that could not become a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    /// 1-based data row (the header is not counted).
    pub row: usize,
    pub record_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<Record>,
    pub rejected: Vec<RowRejection>,
    /// Records kept with a `None` date.
    pub undated: usize,
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

/// `" Posting Date "` -> `"posting_date"`.
pub fn canonical_header(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Currency text to a finite amount. `$1,200.50` -> 1200.5, `(500.00)` -> -500.
pub fn parse_amount(raw: &RawValue) -> Option<f64> {
    let value = match raw {
        RawValue::Number(n) => *n,
        RawValue::Empty => return None,
        RawValue::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
            let cleaned = cleaned.trim();
            match cleaned.strip_prefix('(').and_then(|c| c.strip_suffix(')')) {
                Some(inner) => -inner.trim().parse::<f64>().ok()?,
                None => cleaned.parse::<f64>().ok()?,
            }
        }
    };
    value.is_finite().then_some(value)
}

/// First format that yields a date in [`DATE_YEAR_RANGE`] wins. Unparseable
/// input is `None`, not an error.
pub fn parse_date<S: AsRef<str>>(raw: &RawValue, formats: &[S]) -> Option<NaiveDate> {
    let RawValue::Text(text) = raw else { return None };
    let text = text.trim();
    formats.iter().find_map(|fmt| {
        let fmt = fmt.as_ref();
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(text, fmt).ok().map(|dt| dt.date()))
            .filter(|d| DATE_YEAR_RANGE.contains(&d.year()))
    })
}

pub fn normalize_description(raw: &RawValue) -> String {
    raw.to_text().map(|s| s.to_uppercase()).unwrap_or_default()
}

/// Force the sign from a debit/credit indicator. Unknown indicators leave
/// the amount alone.
pub fn apply_dr_cr(amount: f64, indicator: &str) -> f64 {
    match indicator.trim().to_ascii_uppercase().as_str() {
        "DR" | "D" | "DEBIT" => -amount.abs(),
        "CR" | "C" | "CREDIT" => amount.abs(),
        _ => amount,
    }
}

// ---------------------------------------------------------------------------
// Rows -> records
// ---------------------------------------------------------------------------

struct ColumnIndex {
    id: Option<usize>,
    date: usize,
    description: usize,
    amount: usize,
    dr_cr: Option<usize>,
}

fn resolve_columns(side: Side, table: &RawTable, source: &SourceConfig) -> Result<ColumnIndex, ReconError> {
    let cols = &source.columns;
    let required = |name: &str| -> Result<usize, ReconError> {
        let name = canonical_header(name);
        table.column(&name).ok_or(ReconError::MissingColumn { side, column: name })
    };

    Ok(ColumnIndex {
        id: table.column(&canonical_header(&cols.id)),
        date: required(&cols.date)?,
        description: required(&cols.description)?,
        amount: required(&cols.amount)?,
        dr_cr: cols.dr_cr.as_deref().map(required).transpose()?,
    })
}

/// Turn a raw table into records for one side.
///
/// A missing mapped column fails the whole load. A bad amount rejects only
/// its row; a bad date keeps the row with a `None` date.
pub fn normalize_rows(side: Side, table: &RawTable, source: &SourceConfig) -> Result<Normalized, ReconError> {
    let idx = resolve_columns(side, table, source)?;
    let mut out = Normalized::default();

    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;
        let cell = |c: usize| row.get(c).unwrap_or(&RawValue::Empty);

        let given_id = idx.id.and_then(|c| cell(c).to_text());

        let Some(mut amount) = parse_amount(cell(idx.amount)) else {
            let value = cell(idx.amount).to_text().unwrap_or_default();
            let err = ReconError::AmountParse { side, row: row_no, value };
            log::warn!("{err}");
            out.rejected.push(RowRejection {
                row: row_no,
                record_id: given_id,
                reason: err.to_string(),
            });
            continue;
        };

        if let Some(indicator) = idx.dr_cr.and_then(|c| cell(c).to_text()) {
            amount = apply_dr_cr(amount, &indicator);
        }

        let date = if source.date_formats.is_empty() {
            parse_date(cell(idx.date), DEFAULT_DATE_FORMATS)
        } else {
            parse_date(cell(idx.date), &source.date_formats)
        };
        if date.is_none() {
            log::debug!("{side}, row {row_no}: unparseable date {:?}", cell(idx.date));
            out.undated += 1;
        }

        out.records.push(Record {
            id: given_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            date,
            description: normalize_description(cell(idx.description)),
            amount,
            source: side,
        });
    }

    Ok(out)
}

/// Parse CSV text (header row required) and normalize it.
pub fn load_csv(side: Side, text: &str, source: &SourceConfig) -> Result<Normalized, ReconError> {
    let input_err = |e: csv::Error| ReconError::Input {
        side,
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(input_err)?
        .iter()
        .map(canonical_header)
        .collect();

    let mut rows: Vec<Vec<RawValue>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(input_err)?;
        rows.push(record.iter().map(RawValue::from_field).collect());
    }

    normalize_rows(side, &RawTable { headers, rows }, source)
}

/// Parse a JSON array of objects and normalize it. Headers are the union of
/// keys in first-seen order.
pub fn load_json(side: Side, text: &str, source: &SourceConfig) -> Result<Normalized, ReconError> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(text).map_err(|e| ReconError::Input {
            side,
            message: e.to_string(),
        })?;

    let mut headers: Vec<String> = Vec::new();
    let canonical: Vec<Vec<(String, &serde_json::Value)>> = objects
        .iter()
        .map(|obj| obj.iter().map(|(k, v)| (canonical_header(k), v)).collect())
        .collect();
    for obj in &canonical {
        for (key, _) in obj {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = canonical
        .iter()
        .map(|obj| {
            headers
                .iter()
                .map(|h| {
                    obj.iter()
                        .find(|(k, _)| k == h)
                        .map_or(RawValue::Empty, |(_, v)| RawValue::from_json(v))
                })
                .collect()
        })
        .collect();

    normalize_rows(side, &RawTable { headers, rows }, source)
}
