use std::collections::HashMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::ReconError;
use crate::model::{GroupId, Record, Side};

/// One side's records plus an index-addressed match-status table.
///
/// Records are never added or removed after construction; only their
/// status moves from `None` (active) to `Some(group)`, and never back.
#[derive(Debug, Clone)]
pub struct Ledger {
    side: Side,
    records: Vec<Record>,
    status: Vec<Option<GroupId>>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn new(side: Side, records: Vec<Record>) -> Result<Self, ReconError> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if record.source != side {
                return Err(ReconError::SideMismatch {
                    record_id: record.id.clone(),
                    expected: side,
                    found: record.source,
                });
            }
            if index.insert(record.id.clone(), i).is_some() {
                return Err(ReconError::DuplicateRecord {
                    side,
                    record_id: record.id.clone(),
                });
            }
        }

        let status = vec![None; records.len()];
        Ok(Self {
            side,
            records,
            status,
            index,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Record at an insertion index. Only called with indices handed out by
    /// [`Ledger::active`] on this ledger.
    pub(crate) fn at(&self, idx: usize) -> &Record {
        &self.records[idx]
    }

    pub fn status(&self, id: &str) -> Option<&GroupId> {
        self.index.get(id).and_then(|&i| self.status[i].as_ref())
    }

    /// Unclaimed records with their insertion index, computed from the
    /// current status on every call.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Record)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(i, _)| self.status[*i].is_none())
    }

    pub fn claimed(&self) -> impl Iterator<Item = (&Record, &GroupId)> + '_ {
        self.records
            .iter()
            .zip(&self.status)
            .filter_map(|(r, s)| s.as_ref().map(|g| (r, g)))
    }

    pub fn exceptions(&self) -> impl Iterator<Item = &Record> + '_ {
        self.active().map(|(_, r)| r)
    }

    pub fn active_count(&self) -> usize {
        self.status.iter().filter(|s| s.is_none()).count()
    }

    pub fn claimed_count(&self) -> usize {
        self.len() - self.active_count()
    }

    pub fn undated_count(&self) -> usize {
        self.records.iter().filter(|r| r.date.is_none()).count()
    }

    /// Ledger-wide balance, matched and unmatched alike.
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }

    /// Verify every id exists, is unclaimed and appears once. No mutation.
    pub fn check_claimable<S: AsRef<str>>(&self, record_ids: &[S]) -> Result<Vec<usize>, ReconError> {
        let mut positions = Vec::with_capacity(record_ids.len());
        for id in record_ids {
            let id = id.as_ref();
            let &pos = self.index.get(id).ok_or_else(|| ReconError::UnknownRecord {
                side: self.side,
                record_id: id.to_string(),
            })?;
            if let Some(group_id) = &self.status[pos] {
                return Err(ReconError::AlreadyClaimed {
                    side: self.side,
                    record_id: id.to_string(),
                    group_id: group_id.clone(),
                });
            }
            if positions.contains(&pos) {
                return Err(ReconError::DuplicateRecord {
                    side: self.side,
                    record_id: id.to_string(),
                });
            }
            positions.push(pos);
        }
        Ok(positions)
    }

    /// Assign `group_id` to every referenced record. All or nothing.
    pub fn claim<S: AsRef<str>>(&mut self, record_ids: &[S], group_id: &GroupId) -> Result<(), ReconError> {
        let positions = self.check_claimable(record_ids)?;
        for pos in positions {
            self.status[pos] = Some(group_id.clone());
        }
        Ok(())
    }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Entry<'a> {
            #[serde(flatten)]
            record: &'a Record,
            match_group_id: Option<&'a GroupId>,
        }

        let entries: Vec<Entry<'_>> = self
            .records
            .iter()
            .zip(&self.status)
            .map(|(record, status)| Entry {
                record,
                match_group_id: status.as_ref(),
            })
            .collect();

        let mut s = serializer.serialize_struct("Ledger", 2)?;
        s.serialize_field("side", &self.side)?;
        s.serialize_field("records", &entries)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(id: &str, side: Side, amount: f64) -> Record {
        Record {
            id: id.into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 5),
            description: "ACME CORP".into(),
            amount,
            source: side,
        }
    }

    fn gl_ledger() -> Ledger {
        Ledger::new(
            Side::Gl,
            vec![rec("g1", Side::Gl, -42.0), rec("g2", Side::Gl, 10.0), rec("g3", Side::Gl, 5.5)],
        )
        .unwrap()
    }

    #[test]
    fn active_reflects_claims() {
        let mut ledger = gl_ledger();
        assert_eq!(ledger.active().count(), 3);

        ledger.claim(&["g2"], &GroupId::from_seq(1)).unwrap();
        let active: Vec<usize> = ledger.active().map(|(i, _)| i).collect();
        assert_eq!(active, vec![0, 2]);
        assert_eq!(ledger.status("g2"), Some(&GroupId::from_seq(1)));
        assert_eq!(ledger.claimed_count(), 1);
    }

    #[test]
    fn active_indices_resolve_to_the_same_records() {
        let mut ledger = gl_ledger();
        ledger.claim(&["g1"], &GroupId::from_seq(1)).unwrap();
        for (idx, record) in ledger.active() {
            assert_eq!(ledger.at(idx), record);
            assert_eq!(ledger.get(&record.id), Some(record));
        }
    }

    #[test]
    fn claim_twice_fails() {
        let mut ledger = gl_ledger();
        ledger.claim(&["g1"], &GroupId::from_seq(1)).unwrap();
        let err = ledger.claim(&["g1"], &GroupId::from_seq(2)).unwrap_err();
        assert!(matches!(err, ReconError::AlreadyClaimed { ref group_id, .. } if *group_id == GroupId::from_seq(1)));
        assert_eq!(ledger.status("g1"), Some(&GroupId::from_seq(1)));
    }

    #[test]
    fn claim_is_all_or_nothing() {
        let mut ledger = gl_ledger();
        ledger.claim(&["g3"], &GroupId::from_seq(1)).unwrap();

        // g1 is fine, g3 is taken: nothing may change
        assert!(ledger.claim(&["g1", "g3"], &GroupId::from_seq(2)).is_err());
        assert_eq!(ledger.status("g1"), None);

        assert!(matches!(
            ledger.claim(&["g2", "nope"], &GroupId::from_seq(3)),
            Err(ReconError::UnknownRecord { .. })
        ));
        assert_eq!(ledger.status("g2"), None);

        assert!(matches!(
            ledger.claim(&["g2", "g2"], &GroupId::from_seq(4)),
            Err(ReconError::DuplicateRecord { .. })
        ));
        assert_eq!(ledger.status("g2"), None);
    }

    #[test]
    fn rejects_duplicate_ids_and_wrong_side() {
        let dup = Ledger::new(Side::Bank, vec![rec("b1", Side::Bank, 1.0), rec("b1", Side::Bank, 2.0)]);
        assert!(matches!(dup, Err(ReconError::DuplicateRecord { .. })));

        let wrong = Ledger::new(Side::Bank, vec![rec("g1", Side::Gl, 1.0)]);
        assert!(matches!(wrong, Err(ReconError::SideMismatch { .. })));
    }

    #[test]
    fn total_includes_claimed_records() {
        let mut ledger = gl_ledger();
        ledger.claim(&["g1"], &GroupId::from_seq(1)).unwrap();
        assert!((ledger.total() - (-42.0 + 10.0 + 5.5)).abs() < 1e-9);
    }

    #[test]
    fn serializes_match_status() {
        let mut ledger = gl_ledger();
        ledger.claim(&["g1"], &GroupId::from_seq(7)).unwrap();
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["side"], "GL");
        assert_eq!(json["records"][0]["match_group_id"], "MG-00007");
        assert!(json["records"][1]["match_group_id"].is_null());
        assert_eq!(json["records"][0]["date"], "2026-01-05");
    }
}
