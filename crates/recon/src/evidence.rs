use serde::Serialize;

use crate::ledger::Ledger;
use crate::model::{MatchGroup, MatchRule, ReconSummary};

/// Ledger-wide totals and the resulting variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSummary {
    pub gl_total: f64,
    pub bank_total: f64,
    /// `gl_total - bank_total`.
    pub variance: f64,
    pub variance_epsilon: f64,
    /// `|variance| > variance_epsilon`.
    pub flagged: bool,
}

impl BalanceSummary {
    pub fn compute(gl: &Ledger, bank: &Ledger, variance_epsilon: f64) -> Self {
        let gl_total = gl.total();
        let bank_total = bank.total();
        let variance = gl_total - bank_total;
        Self {
            gl_total,
            bank_total,
            variance,
            variance_epsilon,
            flagged: variance.abs() > variance_epsilon,
        }
    }
}

/// Compute summary statistics from the final ledgers and groups.
pub fn compute_summary(
    gl: &Ledger,
    bank: &Ledger,
    groups: &[MatchGroup],
    variance_epsilon: f64,
) -> ReconSummary {
    let mut exact_groups = 0;
    let mut fuzzy_groups = 0;
    let mut aggregate_groups = 0;
    for g in groups {
        match g.rule {
            MatchRule::Exact => exact_groups += 1,
            MatchRule::Fuzzy { .. } => fuzzy_groups += 1,
            MatchRule::Aggregate => aggregate_groups += 1,
        }
    }

    ReconSummary {
        gl_records: gl.len(),
        bank_records: bank.len(),
        gl_matched: gl.claimed_count(),
        bank_matched: bank.claimed_count(),
        gl_undated: gl.undated_count(),
        bank_undated: bank.undated_count(),
        total_groups: groups.len(),
        exact_groups,
        fuzzy_groups,
        aggregate_groups,
        balance: BalanceSummary::compute(gl, bank, variance_epsilon),
    }
}
