use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::evidence::BalanceSummary;
use crate::ledger::Ledger;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Which ledger a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "GL")]
    Gl,
    Bank,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gl => write!(f, "GL"),
            Self::Bank => write!(f, "Bank"),
        }
    }
}

/// A single normalized transaction line.
///
/// `date` is `None` when the source value could not be parsed; such records
/// never enter a matching layer and end up as exceptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    pub source: Side,
}

// ---------------------------------------------------------------------------
// Match groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Sequence numbers are 1-based, in the order groups are opened.
    pub fn from_seq(seq: u32) -> Self {
        Self(format!("MG-{seq:05}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    Fuzzy { score: u8 },
    Aggregate,
}

impl MatchRule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy { .. } => "fuzzy",
            Self::Aggregate => "aggregate",
        }
    }

    pub fn score(&self) -> Option<u8> {
        match self {
            Self::Fuzzy { score } => Some(*score),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fuzzy { score } => write!(f, "fuzzy ({score}%)"),
            other => f.write_str(other.name()),
        }
    }
}

/// One matching decision. Immutable once opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchGroup {
    pub group_id: GroupId,
    pub rule: MatchRule,
    /// Sum of the bank-side members.
    pub amount: f64,
    pub gl_member_ids: Vec<String>,
    pub bank_member_ids: Vec<String>,
}

/// A layer's decision before it is committed: insertion indices per side.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchProposal {
    pub rule: MatchRule,
    pub gl: Vec<usize>,
    pub bank: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub gl_records: usize,
    pub bank_records: usize,
    pub gl_matched: usize,
    pub bank_matched: usize,
    pub gl_undated: usize,
    pub bank_undated: usize,
    pub total_groups: usize,
    pub exact_groups: usize,
    pub fuzzy_groups: usize,
    pub aggregate_groups: usize,
    pub balance: BalanceSummary,
}

impl ReconSummary {
    pub fn gl_exceptions(&self) -> usize {
        self.gl_records - self.gl_matched
    }

    pub fn bank_exceptions(&self) -> usize {
        self.bank_records - self.bank_matched
    }

    /// Nothing left for manual review.
    pub fn is_reconciled(&self) -> bool {
        self.gl_exceptions() == 0 && self.bank_exceptions() == 0 && !self.balance.flagged
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub groups: Vec<MatchGroup>,
    pub gl: Ledger,
    pub bank: Ledger,
}

impl ReconResult {
    pub fn gl_exceptions(&self) -> Vec<&Record> {
        self.gl.exceptions().collect()
    }

    pub fn bank_exceptions(&self) -> Vec<&Record> {
        self.bank.exceptions().collect()
    }
}
