use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::MatchConfig;
use crate::ledger::Ledger;
use crate::model::{MatchProposal, MatchRule};

/// Active GL records sharing one date, with their summed amount.
#[derive(Debug, Clone, PartialEq)]
pub struct DateBucket {
    pub date: NaiveDate,
    pub gl: Vec<usize>,
    pub total: f64,
}

/// Bucket active, dated GL records by date. Buckets come out in date order,
/// members in insertion order.
pub fn bucket_by_date(ledger: &Ledger) -> Vec<DateBucket> {
    let mut buckets: BTreeMap<NaiveDate, (Vec<usize>, f64)> = BTreeMap::new();
    for (idx, record) in ledger.active() {
        let Some(date) = record.date else { continue };
        let entry = buckets.entry(date).or_insert_with(|| (Vec::new(), 0.0));
        entry.0.push(idx);
        entry.1 += record.amount;
    }

    buckets
        .into_iter()
        .map(|(date, (gl, total))| DateBucket { date, gl, total })
        .collect()
}

/// Many-to-one: a whole GL date bucket against one bank record.
///
/// For each date, the bucket sum is compared with every active bank record
/// of that date; the first in insertion order within tolerance wins, and
/// every GL record of the date joins the group.
///
/// NOTE: the whole bucket is claimed. There is no check that the bank
/// amount is attributable to exactly these GL records, so unrelated entries
/// that happen to sum to an unrelated deposit on the same day get merged.
/// A subset-sum search would change which records match and is not done
/// here.
pub fn match_date_buckets(gl: &Ledger, bank: &Ledger, config: &MatchConfig) -> Vec<MatchProposal> {
    let mut bank_by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (idx, record) in bank.active() {
        if let Some(date) = record.date {
            bank_by_date.entry(date).or_default().push(idx);
        }
    }

    let mut proposals = Vec::new();
    for bucket in bucket_by_date(gl) {
        let Some(candidates) = bank_by_date.get(&bucket.date) else { continue };

        let hit = candidates
            .iter()
            .copied()
            .find(|&idx| config.amounts_close(bank.at(idx).amount, bucket.total));

        if let Some(bank_idx) = hit {
            proposals.push(MatchProposal {
                rule: MatchRule::Aggregate,
                gl: bucket.gl,
                bank: vec![bank_idx],
            });
        }
    }

    proposals
}
