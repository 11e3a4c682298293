//! `auditrec-recon`: layered GL-to-bank reconciliation engine.
//!
//! Pure engine crate: receives CSV/JSON text or pre-built records, returns
//! match groups, final ledgers and a balance summary. No file IO.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod ledger;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod similarity;

pub use config::{MatchConfig, ReconConfig, SourceConfig};
pub use engine::{reconcile, MatchEngine};
pub use error::ReconError;
pub use evidence::BalanceSummary;
pub use ledger::Ledger;
pub use model::{GroupId, MatchGroup, MatchRule, ReconResult, ReconSummary, Record, Side};
pub use normalize::{load_csv, load_json, Normalized, RowRejection};
