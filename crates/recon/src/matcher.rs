use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};

use chrono::NaiveDate;
use ordered_float::OrderedFloat;

use crate::config::MatchConfig;
use crate::ledger::Ledger;
use crate::model::{MatchProposal, MatchRule};
use crate::similarity::ratio;

/// Exact-layer join key: (date, amount, description).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ExactKey<'a> {
    date: NaiveDate,
    amount: OrderedFloat<f64>,
    description: &'a str,
}

/// Pair active GL and bank records with equal (date, amount, description).
///
/// Per key, records pair up one-to-one in insertion order until the shorter
/// side runs out; leftovers stay active. Proposals come out in GL order.
pub fn match_exact(gl: &Ledger, bank: &Ledger) -> Vec<MatchProposal> {
    let mut bank_by_key: HashMap<ExactKey<'_>, VecDeque<usize>> = HashMap::new();
    for (idx, record) in bank.active() {
        let Some(date) = record.date else { continue };
        let key = ExactKey {
            date,
            amount: OrderedFloat(record.amount),
            description: &record.description,
        };
        bank_by_key.entry(key).or_default().push_back(idx);
    }

    let mut proposals = Vec::new();
    for (gl_idx, record) in gl.active() {
        let Some(date) = record.date else { continue };
        let key = ExactKey {
            date,
            amount: OrderedFloat(record.amount),
            description: &record.description,
        };
        if let Some(bank_idx) = bank_by_key.get_mut(&key).and_then(VecDeque::pop_front) {
            proposals.push(MatchProposal {
                rule: MatchRule::Exact,
                gl: vec![gl_idx],
                bank: vec![bank_idx],
            });
        }
    }

    proposals
}

/// A bank record competing for one GL record in the fuzzy layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyCandidate {
    pub bank_idx: usize,
    pub score: u8,
}

impl FuzzyCandidate {
    /// Higher ranks win: score descending, then insertion index ascending.
    fn rank(&self) -> (u8, Reverse<usize>) {
        (self.score, Reverse(self.bank_idx))
    }
}

/// Pick the winning candidate, if any.
pub fn best_candidate(candidates: &[FuzzyCandidate]) -> Option<FuzzyCandidate> {
    candidates.iter().copied().max_by_key(FuzzyCandidate::rank)
}

/// Same date, same amount, similar description.
///
/// GL records are visited in insertion order; a bank record taken by one GL
/// record is out of the candidate set for every later GL record in the pass.
pub fn match_fuzzy(gl: &Ledger, bank: &Ledger, config: &MatchConfig) -> Vec<MatchProposal> {
    let mut bank_by_slot: HashMap<(NaiveDate, OrderedFloat<f64>), Vec<usize>> = HashMap::new();
    for (idx, record) in bank.active() {
        if let Some(date) = record.date {
            bank_by_slot
                .entry((date, OrderedFloat(record.amount)))
                .or_default()
                .push(idx);
        }
    }

    let mut taken: HashSet<usize> = HashSet::new();
    let mut proposals = Vec::new();

    for (gl_idx, gl_record) in gl.active() {
        let Some(date) = gl_record.date else { continue };
        let Some(slot) = bank_by_slot.get(&(date, OrderedFloat(gl_record.amount))) else {
            continue;
        };

        let candidates: Vec<FuzzyCandidate> = slot
            .iter()
            .filter(|idx| !taken.contains(*idx))
            .map(|&bank_idx| FuzzyCandidate {
                bank_idx,
                score: ratio(&gl_record.description, &bank.at(bank_idx).description),
            })
            .collect();

        let Some(best) = best_candidate(&candidates) else { continue };
        if best.score <= config.fuzzy_threshold {
            log::trace!(
                "fuzzy: '{}' best score {} not above {}",
                gl_record.id,
                best.score,
                config.fuzzy_threshold
            );
            continue;
        }

        taken.insert(best.bank_idx);
        proposals.push(MatchProposal {
            rule: MatchRule::Fuzzy { score: best.score },
            gl: vec![gl_idx],
            bank: vec![best.bank_idx],
        });
    }

    proposals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupId, Record, Side};

    fn rec(side: Side, id: &str, date: Option<&str>, amount: f64, desc: &str) -> Record {
        Record {
            id: id.into(),
            date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            description: desc.into(),
            amount,
            source: side,
        }
    }

    fn gl(rows: Vec<(&str, Option<&str>, f64, &str)>) -> Ledger {
        Ledger::new(
            Side::Gl,
            rows.into_iter().map(|(id, d, a, s)| rec(Side::Gl, id, d, a, s)).collect(),
        )
        .unwrap()
    }

    fn bank(rows: Vec<(&str, Option<&str>, f64, &str)>) -> Ledger {
        Ledger::new(
            Side::Bank,
            rows.into_iter().map(|(id, d, a, s)| rec(Side::Bank, id, d, a, s)).collect(),
        )
        .unwrap()
    }

    const D: Option<&str> = Some("2026-01-05");

    #[test]
    fn exact_pairs_min_of_both_sides_in_order() {
        let g = gl(vec![
            ("g1", D, -42.0, "ACME CORP"),
            ("g2", D, -42.0, "ACME CORP"),
            ("g3", D, -42.0, "ACME CORP"),
        ]);
        let b = bank(vec![("b1", D, -42.0, "ACME CORP"), ("b2", D, -42.0, "ACME CORP")]);

        let out = match_exact(&g, &b);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].gl.clone(), out[0].bank.clone()), (vec![0], vec![0]));
        assert_eq!((out[1].gl.clone(), out[1].bank.clone()), (vec![1], vec![1]));
        assert!(out.iter().all(|p| p.rule == MatchRule::Exact));
    }

    #[test]
    fn exact_requires_all_three_fields() {
        let g = gl(vec![
            ("g1", D, -42.0, "ACME CORP"),
            ("g2", Some("2026-01-06"), -42.0, "ACME CORP"),
            ("g3", D, -42.01, "ACME CORP"),
        ]);
        let b = bank(vec![("b1", D, -42.0, "ACME CORP."), ("b2", D, -42.0, "ACME CORP")]);

        let out = match_exact(&g, &b);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].gl, vec![0]);
        assert_eq!(out[0].bank, vec![1]);
    }

    #[test]
    fn exact_skips_undated_and_claimed() {
        let g = gl(vec![("g1", None, 5.0, "FEE"), ("g2", D, 5.0, "FEE")]);
        let mut b = bank(vec![("b1", None, 5.0, "FEE"), ("b2", D, 5.0, "FEE"), ("b3", D, 5.0, "FEE")]);
        b.claim(&["b2"], &GroupId::from_seq(1)).unwrap();

        let out = match_exact(&g, &b);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].gl, vec![1]);
        assert_eq!(out[0].bank, vec![2]);
    }

    #[test]
    fn exact_empty_sides() {
        let b = bank(vec![("b1", D, 1.0, "X")]);
        assert!(match_exact(&gl(vec![]), &b).is_empty());
        assert!(match_exact(&gl(vec![("g1", D, 1.0, "X")]), &bank(vec![])).is_empty());
    }

    #[test]
    fn best_candidate_prefers_score_then_first_seen() {
        let cands = [
            FuzzyCandidate { bank_idx: 4, score: 90 },
            FuzzyCandidate { bank_idx: 2, score: 95 },
            FuzzyCandidate { bank_idx: 7, score: 95 },
        ];
        assert_eq!(best_candidate(&cands), Some(FuzzyCandidate { bank_idx: 2, score: 95 }));
        assert_eq!(best_candidate(&[]), None);
    }

    #[test]
    fn fuzzy_threshold_is_strict() {
        let config = MatchConfig::default();
        // exactly 80
        let g = gl(vec![("g1", D, 10.0, "ABCDEFGHIJ")]);
        let b = bank(vec![("b1", D, 10.0, "ABCDEFGHXY")]);
        assert!(match_fuzzy(&g, &b, &config).is_empty());

        // 80.5 rounds to even, still a miss
        let long_gl = format!("{}{}", "A".repeat(161), "B".repeat(39));
        let long_bank = format!("{}{}", "A".repeat(161), "C".repeat(39));
        let g = gl(vec![("g1", D, 10.0, long_gl.as_str())]);
        let b = bank(vec![("b1", D, 10.0, long_bank.as_str())]);
        assert!(match_fuzzy(&g, &b, &config).is_empty());

        // 81
        let g = gl(vec![("g1", D, 10.0, "ABCDEFGHIJKLMNOPQRSTUVWXYZ")]);
        let b = bank(vec![("b1", D, 10.0, "ABCDEFGHIJKLMNOPQRSTU12345")]);
        let out = match_fuzzy(&g, &b, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rule, MatchRule::Fuzzy { score: 81 });
    }

    #[test]
    fn fuzzy_needs_same_date_and_amount() {
        let config = MatchConfig::default();
        let g = gl(vec![("g1", D, 200.0, "STARBUCKS CORPORATION")]);
        let b = bank(vec![
            ("b1", Some("2026-01-06"), 200.0, "STARBUCKS CORPORATION"),
            ("b2", D, 200.01, "STARBUCKS CORPORATION"),
        ]);
        assert!(match_fuzzy(&g, &b, &config).is_empty());
    }

    #[test]
    fn fuzzy_claimed_bank_unavailable_to_later_gl() {
        let config = MatchConfig::default();
        // g1 and g2 both fit b1 best; g1 goes first and takes it.
        let g = gl(vec![
            ("g1", D, 50.0, "WALMART INC"),
            ("g2", D, 50.0, "WALMART INC."),
        ]);
        let b = bank(vec![("b1", D, 50.0, "WALMART INC"), ("b2", D, 50.0, "WALMART INCORPORATED")]);

        let out = match_fuzzy(&g, &b, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].gl, vec![0]);
        assert_eq!(out[0].bank, vec![0]);
        // g2 vs b2 is left below the cutoff
        assert_eq!(ratio("WALMART INC.", "WALMART INCORPORATED"), 69);
    }

    #[test]
    fn fuzzy_tie_goes_to_first_bank_record() {
        let config = MatchConfig::default();
        let g = gl(vec![("g1", D, 9.99, "NETFLIX INC")]);
        let b = bank(vec![("b1", D, 9.99, "NETFLIX INC 1"), ("b2", D, 9.99, "NETFLIX INC 2")]);

        let out = match_fuzzy(&g, &b, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bank, vec![0]);
    }

    #[test]
    fn fuzzy_custom_threshold() {
        let config = MatchConfig {
            fuzzy_threshold: 60,
            ..MatchConfig::default()
        };
        let g = gl(vec![("g1", D, 200.0, "STARBUCKS CORPORATION")]);
        let b = bank(vec![("b1", D, 200.0, "STARBUCKS CORP #4471")]);
        let out = match_fuzzy(&g, &b, &config);
        assert_eq!(out[0].rule, MatchRule::Fuzzy { score: 68 });
    }
}
