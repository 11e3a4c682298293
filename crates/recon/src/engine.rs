use crate::aggregate::match_date_buckets;
use crate::config::MatchConfig;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::ledger::Ledger;
use crate::matcher::{match_exact, match_fuzzy};
use crate::model::{GroupId, MatchGroup, MatchProposal, ReconMeta, ReconResult, Record, Side};

/// Owns both ledgers for one run and commits layer proposals as groups.
#[derive(Debug)]
pub struct MatchEngine {
    config: MatchConfig,
    gl: Ledger,
    bank: Ledger,
    groups: Vec<MatchGroup>,
}

impl MatchEngine {
    pub fn new(config: MatchConfig, gl: Ledger, bank: Ledger) -> Result<Self, ReconError> {
        config.validate()?;
        for (expected, ledger) in [(Side::Gl, &gl), (Side::Bank, &bank)] {
            if ledger.side() != expected {
                return Err(ReconError::LedgerSide {
                    expected,
                    found: ledger.side(),
                });
            }
        }

        Ok(Self {
            config,
            gl,
            bank,
            groups: Vec::new(),
        })
    }

    pub fn groups(&self) -> &[MatchGroup] {
        &self.groups
    }

    pub fn gl(&self) -> &Ledger {
        &self.gl
    }

    pub fn bank(&self) -> &Ledger {
        &self.bank
    }

    /// Exact, then fuzzy, then aggregate. Each layer sees only what the
    /// previous ones left active.
    pub fn run(mut self, name: &str) -> Result<ReconResult, ReconError> {
        self.run_layers()?;

        let summary = compute_summary(&self.gl, &self.bank, &self.groups, self.config.variance_epsilon);
        log::info!(
            "{name}: {} groups, {} GL / {} Bank exceptions, variance {:.2}",
            summary.total_groups,
            summary.gl_exceptions(),
            summary.bank_exceptions(),
            summary.balance.variance
        );

        Ok(ReconResult {
            meta: ReconMeta {
                name: name.to_string(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            groups: self.groups,
            gl: self.gl,
            bank: self.bank,
        })
    }

    /// Apply all three layers in order. Returns the number of groups opened.
    pub fn run_layers(&mut self) -> Result<usize, ReconError> {
        let before = self.groups.len();

        let exact = match_exact(&self.gl, &self.bank);
        self.commit("exact", exact)?;

        let fuzzy = match_fuzzy(&self.gl, &self.bank, &self.config);
        self.commit("fuzzy", fuzzy)?;

        let aggregate = match_date_buckets(&self.gl, &self.bank, &self.config);
        self.commit("aggregate", aggregate)?;

        Ok(self.groups.len() - before)
    }

    fn commit(&mut self, layer: &str, proposals: Vec<MatchProposal>) -> Result<(), ReconError> {
        let count = proposals.len();
        for proposal in proposals {
            self.open_group(proposal)?;
        }
        log::info!(
            "{layer}: {count} groups, {} GL / {} Bank still active",
            self.gl.active_count(),
            self.bank.active_count()
        );
        Ok(())
    }

    /// Claim every member on both sides under a fresh group id.
    fn open_group(&mut self, proposal: MatchProposal) -> Result<(), ReconError> {
        let gl_ids: Vec<String> = proposal.gl.iter().map(|&i| self.gl.at(i).id.clone()).collect();
        let bank_ids: Vec<String> = proposal.bank.iter().map(|&i| self.bank.at(i).id.clone()).collect();

        let group_id = GroupId::from_seq(self.groups.len() as u32 + 1);

        // Bank is checked up front so a failure leaves both ledgers untouched.
        self.bank.check_claimable(&bank_ids)?;
        self.gl.claim(&gl_ids, &group_id)?;
        self.bank.claim(&bank_ids, &group_id)?;

        let amount: f64 = proposal.bank.iter().map(|&i| self.bank.at(i).amount).sum();
        log::debug!(
            "{group_id} {}: GL {:?} <-> Bank {:?} ({amount:.2})",
            proposal.rule,
            gl_ids,
            bank_ids
        );

        self.groups.push(MatchGroup {
            group_id,
            rule: proposal.rule,
            amount,
            gl_member_ids: gl_ids,
            bank_member_ids: bank_ids,
        });
        Ok(())
    }
}

/// Build both ledgers and run the engine in one call.
pub fn reconcile(
    name: &str,
    config: MatchConfig,
    gl_records: Vec<Record>,
    bank_records: Vec<Record>,
) -> Result<ReconResult, ReconError> {
    let gl = Ledger::new(Side::Gl, gl_records)?;
    let bank = Ledger::new(Side::Bank, bank_records)?;
    MatchEngine::new(config, gl, bank)?.run(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchRule;
    use chrono::NaiveDate;

    fn rec(side: Side, id: &str, day: u32, amount: f64, desc: &str) -> Record {
        Record {
            id: id.into(),
            date: NaiveDate::from_ymd_opt(2026, 1, day),
            description: desc.into(),
            amount,
            source: side,
        }
    }

    fn engine(gl: Vec<Record>, bank: Vec<Record>) -> MatchEngine {
        MatchEngine::new(
            MatchConfig::default(),
            Ledger::new(Side::Gl, gl).unwrap(),
            Ledger::new(Side::Bank, bank).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_swapped_ledgers() {
        let gl = Ledger::new(Side::Gl, vec![]).unwrap();
        let bank = Ledger::new(Side::Bank, vec![]).unwrap();
        let err = MatchEngine::new(MatchConfig::default(), bank, gl).unwrap_err();
        assert!(matches!(err, ReconError::LedgerSide { expected: Side::Gl, .. }));
    }

    #[test]
    fn rejects_invalid_policy() {
        let config = MatchConfig {
            fuzzy_threshold: 120,
            ..MatchConfig::default()
        };
        let gl = Ledger::new(Side::Gl, vec![]).unwrap();
        let bank = Ledger::new(Side::Bank, vec![]).unwrap();
        assert!(MatchEngine::new(config, gl, bank).is_err());
    }

    #[test]
    fn layers_run_in_order_with_sequential_ids() {
        let gl = vec![
            rec(Side::Gl, "g-fuzzy", 3, -200.0, "STARBUCKS CORPORATION"),
            rec(Side::Gl, "g-exact", 2, -42.0, "ACME CORP"),
            rec(Side::Gl, "g-a", 4, -100.0, "PART A"),
            rec(Side::Gl, "g-b", 4, -100.0, "PART B"),
        ];
        let bank = vec![
            rec(Side::Bank, "b-batch", 4, -200.0, "BATCH SETTLEMENT TOTAL"),
            rec(Side::Bank, "b-fuzzy", 3, -200.0, "STARBUCKS CORPORTN #"),
            rec(Side::Bank, "b-exact", 2, -42.0, "ACME CORP"),
        ];

        let result = engine(gl, bank).run("order").unwrap();
        let rules: Vec<(&str, MatchRule)> = result
            .groups
            .iter()
            .map(|g| (g.group_id.as_str(), g.rule))
            .collect();
        assert_eq!(
            rules,
            vec![
                ("MG-00001", MatchRule::Exact),
                ("MG-00002", MatchRule::Fuzzy { score: 88 }),
                ("MG-00003", MatchRule::Aggregate),
            ]
        );
        assert_eq!(result.groups[2].gl_member_ids, vec!["g-a", "g-b"]);
        assert_eq!(result.groups[2].amount, -200.0);
        assert_eq!(result.gl.status("g-fuzzy"), Some(&GroupId::from_seq(2)));
        assert!(result.summary.is_reconciled());
        assert_eq!(result.meta.name, "order");
    }

    #[test]
    fn exact_layer_runs_before_aggregate_can_see_records() {
        // Alone, g1 would form a one-record aggregate bucket with b1. Exact
        // takes it first.
        let gl = vec![rec(Side::Gl, "g1", 2, 10.0, "FEE")];
        let bank = vec![rec(Side::Bank, "b1", 2, 10.0, "FEE")];
        let result = engine(gl, bank).run("x").unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].rule, MatchRule::Exact);
    }

    #[test]
    fn second_pass_finds_nothing() {
        let gl = vec![
            rec(Side::Gl, "g1", 2, 10.0, "FEE"),
            rec(Side::Gl, "g2", 3, 11.0, "OTHER"),
        ];
        let bank = vec![rec(Side::Bank, "b1", 2, 10.0, "FEE"), rec(Side::Bank, "b2", 5, 3.0, "X")];
        let mut engine = engine(gl, bank);
        assert_eq!(engine.run_layers().unwrap(), 1);
        assert_eq!(engine.run_layers().unwrap(), 0);
        assert_eq!(engine.groups().len(), 1);
        assert_eq!(engine.gl().active_count(), 1);
        assert_eq!(engine.bank().active_count(), 1);
    }

    #[test]
    fn claim_conflict_is_fatal_and_leaves_ledgers_untouched() {
        let gl = vec![rec(Side::Gl, "g1", 2, 10.0, "FEE"), rec(Side::Gl, "g2", 2, 10.0, "FEE")];
        let bank = vec![rec(Side::Bank, "b1", 2, 10.0, "FEE")];
        let mut engine = engine(gl, bank);
        engine
            .open_group(MatchProposal {
                rule: MatchRule::Exact,
                gl: vec![0],
                bank: vec![0],
            })
            .unwrap();

        let err = engine
            .open_group(MatchProposal {
                rule: MatchRule::Exact,
                gl: vec![1],
                bank: vec![0],
            })
            .unwrap_err();
        assert!(matches!(err, ReconError::AlreadyClaimed { side: Side::Bank, .. }));
        assert_eq!(engine.gl().status("g2"), None);
        assert_eq!(engine.groups().len(), 1);
    }

    #[test]
    fn empty_ledgers_are_not_an_error() {
        let result = reconcile("empty", MatchConfig::default(), vec![], vec![]).unwrap();
        assert!(result.groups.is_empty());
        assert!(result.summary.is_reconciled());
    }
}
