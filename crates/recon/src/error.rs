use thiserror::Error;

use crate::model::{GroupId, Side};

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty file path, clashing columns, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Required column absent from the input header.
    #[error("{side}: missing column '{column}'")]
    MissingColumn { side: Side, column: String },
    /// Amount could not be parsed. Fatal for that row only.
    #[error("{side}, row {row}: cannot parse amount '{value}'")]
    AmountParse { side: Side, row: usize, value: String },
    /// Unreadable CSV / JSON text.
    #[error("{side}: invalid input: {message}")]
    Input { side: Side, message: String },
    /// Two records in one ledger share an id.
    #[error("{side}: duplicate record id '{record_id}'")]
    DuplicateRecord { side: Side, record_id: String },
    /// A record was handed to the ledger of the other side.
    #[error("record '{record_id}' belongs to {found}, not {expected}")]
    SideMismatch {
        record_id: String,
        expected: Side,
        found: Side,
    },
    /// A GL ledger was passed where a Bank ledger belongs, or vice versa.
    #[error("expected a {expected} ledger, got {found}")]
    LedgerSide { expected: Side, found: Side },
    /// Claim referenced an id the ledger does not hold.
    #[error("{side}: unknown record '{record_id}'")]
    UnknownRecord { side: Side, record_id: String },
    /// Claim hit a record already owned by a group. Engine invariant violation.
    #[error("{side}: record '{record_id}' already claimed by {group_id}")]
    AlreadyClaimed {
        side: Side,
        record_id: String,
        group_id: GroupId,
    },
}
