// CSV export of the exception report, one file per section

use std::path::{Path, PathBuf};

use crate::error::ReportError;
use crate::report::{ExceptionReport, ExceptionRow, SummaryValue, EXCEPTION_HEADERS, MATCHED_HEADERS};

pub const SUMMARY_FILE: &str = "summary.csv";
pub const GL_EXCEPTIONS_FILE: &str = "gl_exceptions.csv";
pub const BANK_EXCEPTIONS_FILE: &str = "bank_exceptions.csv";
pub const MATCHED_FILE: &str = "matched.csv";

/// Write the four section files into `dir`, creating it if needed.
/// Returns the paths written, in section order.
pub fn write_sections(report: &ExceptionReport, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    std::fs::create_dir_all(dir)?;

    let summary = dir.join(SUMMARY_FILE);
    write_summary(report, &summary)?;

    let gl = dir.join(GL_EXCEPTIONS_FILE);
    write_exceptions(&report.gl_exceptions, &gl)?;

    let bank = dir.join(BANK_EXCEPTIONS_FILE);
    write_exceptions(&report.bank_exceptions, &bank)?;

    let matched = dir.join(MATCHED_FILE);
    write_matched(report, &matched)?;

    log::info!("wrote 4 CSV sections to {}", dir.display());
    Ok(vec![summary, gl, bank, matched])
}

fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

fn write_summary(report: &ExceptionReport, path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Metric", "Value", "Flagged"])?;

    for (label, value) in report.summary_lines() {
        let value = match value {
            SummaryValue::Money(amount) => money(amount),
            SummaryValue::Count(n) => n.to_string(),
        };
        let flagged = if label == "Variance" && report.balance.flagged { "yes" } else { "" };
        writer.write_record([label, value.as_str(), flagged])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_exceptions(rows: &[ExceptionRow], path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(EXCEPTION_HEADERS)?;

    for r in rows {
        let date = r.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        writer.write_record([
            r.id.as_str(),
            date.as_str(),
            r.description.as_str(),
            money(r.amount).as_str(),
            r.source.to_string().as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_matched(report: &ExceptionReport, path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(MATCHED_HEADERS)?;

    for m in &report.matched {
        writer.write_record([
            m.group_id.clone(),
            m.rule.to_string(),
            m.score.map(|s| s.to_string()).unwrap_or_default(),
            money(m.amount),
            m.gl_count.to_string(),
            m.bank_count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditrec_recon::config::MatchConfig;
    use auditrec_recon::engine::reconcile;
    use auditrec_recon::model::{Record, Side};
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

    #[test]
    fn writes_four_files() {
        let result = reconcile(
            "Jan",
            MatchConfig::default(),
            vec![
                rec(Side::Gl, "g1", 6, -200.0, "STARBUCKS CORPORATION"),
                rec(Side::Gl, "g2", 8, -75.25, "UNCLEARED CHECK, 1042"),
            ],
            vec![rec(Side::Bank, "b1", 6, -200.0, "STARBUCKS CORPORTN #")],
        )
        .unwrap();
        let report = ExceptionReport::from_result(&result);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report");
        let paths = write_sections(&report, &out).unwrap();
        assert_eq!(paths.len(), 4);
        assert!(paths.iter().all(|p| p.exists()));

        let summary = std::fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        assert!(summary.starts_with("Metric,Value,Flagged\n"));
        assert!(summary.contains("Variance,-75.25,yes\n"));
        assert!(summary.contains("Match Groups,1,\n"));

        let gl = std::fs::read_to_string(out.join(GL_EXCEPTIONS_FILE)).unwrap();
        assert_eq!(
            gl,
            "ID,Date,Description,Amount,Source\ng2,2026-01-08,\"UNCLEARED CHECK, 1042\",-75.25,GL\n"
        );

        let bank = std::fs::read_to_string(out.join(BANK_EXCEPTIONS_FILE)).unwrap();
        assert_eq!(bank.lines().count(), 1);

        let matched = std::fs::read_to_string(out.join(MATCHED_FILE)).unwrap();
        assert!(matched.contains("MG-00001,fuzzy,88,-200.00,1,1\n"));
    }
}
