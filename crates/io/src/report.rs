use chrono::NaiveDate;
use serde::Serialize;

use auditrec_recon::evidence::BalanceSummary;
use auditrec_recon::model::{ReconResult, Record, Side};

pub const SUMMARY_SHEET: &str = "Summary";
pub const GL_EXCEPTIONS_SHEET: &str = "GL Exceptions";
pub const BANK_EXCEPTIONS_SHEET: &str = "Bank Exceptions";
pub const MATCHED_SHEET: &str = "Matched Transactions";

pub const EXCEPTION_HEADERS: [&str; 5] = ["ID", "Date", "Description", "Amount", "Source"];
pub const MATCHED_HEADERS: [&str; 6] = ["Match ID", "Rule", "Score", "Amount", "GL Count", "Bank Count"];

/// The four report sections, detached from the engine types.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionReport {
    pub name: String,
    pub balance: BalanceSummary,
    pub group_count: usize,
    pub gl_exceptions: Vec<ExceptionRow>,
    pub bank_exceptions: Vec<ExceptionRow>,
    pub matched: Vec<MatchedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionRow {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    pub source: Side,
}

impl From<&Record> for ExceptionRow {
    fn from(r: &Record) -> Self {
        Self {
            id: r.id.clone(),
            date: r.date,
            description: r.description.clone(),
            amount: r.amount,
            source: r.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRow {
    pub group_id: String,
    pub rule: &'static str,
    pub score: Option<u8>,
    pub amount: f64,
    pub gl_count: usize,
    pub bank_count: usize,
}

/// One labelled line of the Summary section.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryValue {
    Money(f64),
    Count(usize),
}

impl ExceptionReport {
    pub fn from_result(result: &ReconResult) -> Self {
        Self {
            name: result.meta.name.clone(),
            balance: result.summary.balance.clone(),
            group_count: result.groups.len(),
            gl_exceptions: result.gl.exceptions().map(ExceptionRow::from).collect(),
            bank_exceptions: result.bank.exceptions().map(ExceptionRow::from).collect(),
            matched: result
                .groups
                .iter()
                .map(|g| MatchedRow {
                    group_id: g.group_id.to_string(),
                    rule: g.rule.name(),
                    score: g.rule.score(),
                    amount: g.amount,
                    gl_count: g.gl_member_ids.len(),
                    bank_count: g.bank_member_ids.len(),
                })
                .collect(),
        }
    }

    /// Summary lines in display order. The variance line is the one that
    /// gets flagged.
    pub fn summary_lines(&self) -> Vec<(&'static str, SummaryValue)> {
        vec![
            ("Total GL Balance", SummaryValue::Money(self.balance.gl_total)),
            ("Total Bank Balance", SummaryValue::Money(self.balance.bank_total)),
            ("Variance", SummaryValue::Money(self.balance.variance)),
            ("Match Groups", SummaryValue::Count(self.group_count)),
            ("GL Exceptions", SummaryValue::Count(self.gl_exceptions.len())),
            ("Bank Exceptions", SummaryValue::Count(self.bank_exceptions.len())),
        ]
    }
}
