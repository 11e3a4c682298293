// Excel rendering of the exception report

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatBorder, Workbook, Worksheet};

use crate::error::ReportError;
use crate::report::{
    ExceptionReport, ExceptionRow, SummaryValue, BANK_EXCEPTIONS_SHEET, EXCEPTION_HEADERS,
    GL_EXCEPTIONS_SHEET, MATCHED_HEADERS, MATCHED_SHEET, SUMMARY_SHEET,
};

pub const MONEY_FORMAT: &str = "$#,##0.00";
pub const DATE_FORMAT: &str = "mm/dd/yyyy";

/// Cell formats shared by every sheet.
struct Styles {
    header: Format,
    money: Format,
    date: Format,
    flagged: Format,
    text: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xD3D3D3))
                .set_border(FormatBorder::Thin),
            money: Format::new().set_num_format(MONEY_FORMAT),
            date: Format::new().set_num_format(DATE_FORMAT),
            flagged: Format::new()
                .set_num_format(MONEY_FORMAT)
                .set_background_color(Color::RGB(0xFFC7CE))
                .set_font_color(Color::RGB(0x9C0006)),
            text: Format::new(),
        }
    }
}

/// Write the four-sheet workbook to `path`.
pub fn write_report(report: &ExceptionReport, path: &Path) -> Result<(), ReportError> {
    let mut workbook = build_workbook(report)?;
    workbook.save(path)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

pub fn build_workbook(report: &ExceptionReport) -> Result<Workbook, ReportError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();

    write_summary(workbook.add_worksheet().set_name(SUMMARY_SHEET)?, report, &styles)?;
    write_exceptions(
        workbook.add_worksheet().set_name(GL_EXCEPTIONS_SHEET)?,
        &report.gl_exceptions,
        &styles,
    )?;
    write_exceptions(
        workbook.add_worksheet().set_name(BANK_EXCEPTIONS_SHEET)?,
        &report.bank_exceptions,
        &styles,
    )?;
    write_matched(workbook.add_worksheet().set_name(MATCHED_SHEET)?, report, &styles)?;

    Ok(workbook)
}

fn write_header(ws: &mut Worksheet, headers: &[&str], widths: &[f64], styles: &Styles) -> Result<(), ReportError> {
    for (col, (title, width)) in headers.iter().zip(widths).enumerate() {
        let col = col as u16;
        ws.write_string_with_format(0, col, *title, &styles.header)?;
        ws.set_column_width(col, *width)?;
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_summary(ws: &mut Worksheet, report: &ExceptionReport, styles: &Styles) -> Result<(), ReportError> {
    write_header(ws, &["Metric", "Value"], &[24.0, 18.0], styles)?;

    for (i, (label, value)) in report.summary_lines().into_iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string_with_format(row, 0, label, &styles.text)?;
        match value {
            SummaryValue::Money(amount) => {
                let format = if label == "Variance" && report.balance.flagged {
                    &styles.flagged
                } else {
                    &styles.money
                };
                ws.write_number_with_format(row, 1, amount, format)?;
            }
            SummaryValue::Count(n) => {
                ws.write_number_with_format(row, 1, n as f64, &styles.text)?;
            }
        }
    }
    Ok(())
}

fn write_exceptions(ws: &mut Worksheet, rows: &[ExceptionRow], styles: &Styles) -> Result<(), ReportError> {
    write_header(ws, &EXCEPTION_HEADERS, &[38.0, 12.0, 36.0, 14.0, 8.0], styles)?;

    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string_with_format(row, 0, &r.id, &styles.text)?;
        // undated records leave the cell empty
        if let Some(date) = r.date {
            write_date(ws, row, 1, date, styles)?;
        }
        ws.write_string_with_format(row, 2, &r.description, &styles.text)?;
        ws.write_number_with_format(row, 3, r.amount, &styles.money)?;
        ws.write_string_with_format(row, 4, r.source.to_string(), &styles.text)?;
    }
    Ok(())
}

/// Excel serial dates only cover years 1900-9999; anything else is written
/// as ISO text so the row survives.
fn write_date(ws: &mut Worksheet, row: u32, col: u16, date: NaiveDate, styles: &Styles) -> Result<(), ReportError> {
    let excel_date = u16::try_from(date.year())
        .ok()
        .and_then(|y| ExcelDateTime::from_ymd(y, date.month() as u8, date.day() as u8).ok());
    match excel_date {
        Some(dt) => {
            ws.write_datetime_with_format(row, col, &dt, &styles.date)?;
        }
        None => {
            log::debug!("date {date} outside the Excel range, written as text");
            ws.write_string_with_format(row, col, date.format("%Y-%m-%d").to_string(), &styles.text)?;
        }
    }
    Ok(())
}

fn write_matched(ws: &mut Worksheet, report: &ExceptionReport, styles: &Styles) -> Result<(), ReportError> {
    write_header(ws, &MATCHED_HEADERS, &[12.0, 12.0, 8.0, 14.0, 10.0, 10.0], styles)?;

    for (i, m) in report.matched.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string_with_format(row, 0, &m.group_id, &styles.text)?;
        ws.write_string_with_format(row, 1, m.rule, &styles.text)?;
        if let Some(score) = m.score {
            ws.write_number_with_format(row, 2, score as f64, &styles.text)?;
        }
        ws.write_number_with_format(row, 3, m.amount, &styles.money)?;
        ws.write_number_with_format(row, 4, m.gl_count as f64, &styles.text)?;
        ws.write_number_with_format(row, 5, m.bank_count as f64, &styles.text)?;
    }
    Ok(())
}
