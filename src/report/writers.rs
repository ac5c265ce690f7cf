use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::model::BatchReport;
use crate::util::ensure_directory;

use super::{ReportRow, ReportSummary};

const DISCREPANCY_HEADERS: [&str; 8] = [
    "Document",
    "Identifier",
    "Type",
    "Field / Item",
    "Reference Value",
    "Document Value",
    "Difference",
    "Description",
];

const EMPTY_REPORT_MESSAGE: &str = "No discrepancies found in the processed documents.";

pub fn write_report_csv(path: &Path, rows: &[ReportRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)
        .with_context(|| format!("failed to create csv file: {}", path.display()))?;

    if rows.is_empty() {
        writer
            .write_record(["Identifier", "PDF File", "Status", "Data Errors"])
            .with_context(|| format!("failed to write csv header: {}", path.display()))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write csv row: {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush csv file: {}", path.display()))?;
    Ok(())
}

/// Workbook with a `Discrepancies` sheet (one row per entry, or a single
/// message row when there are none) and a `Summary` sheet of metrics.
pub fn write_discrepancy_xlsx(
    path: &Path,
    report: &BatchReport,
    summary: &ReportSummary,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let header = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let sheet = workbook
        .add_worksheet()
        .set_name("Discrepancies")
        .context("failed to create Discrepancies sheet")?;
    write_discrepancies(sheet, report, &header).context("failed to write Discrepancies sheet")?;

    let sheet = workbook
        .add_worksheet()
        .set_name("Summary")
        .context("failed to create Summary sheet")?;
    write_summary(sheet, summary, &header).context("failed to write Summary sheet")?;

    workbook
        .save(path)
        .with_context(|| format!("failed to save xlsx file: {}", path.display()))?;
    Ok(())
}

fn write_discrepancies(
    sheet: &mut Worksheet,
    report: &BatchReport,
    header: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    if report.discrepancies().next().is_none() {
        sheet.write_string_with_format(0, 0, "Message", header)?;
        sheet.write_string(1, 0, EMPTY_REPORT_MESSAGE)?;
        return Ok(());
    }

    for (column, title) in DISCREPANCY_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, column as u16, *title, header)?;
    }

    for (index, entry) in report.discrepancies().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &entry.source_file)?;
        sheet.write_string(row, 1, entry.identifier.as_deref().unwrap_or_default())?;
        sheet.write_string(row, 2, entry.kind.as_str())?;
        sheet.write_string(row, 3, entry.field_or_item_name.as_deref().unwrap_or_default())?;
        sheet.write_string(row, 4, entry.reference_value.as_deref().unwrap_or_default())?;
        sheet.write_string(row, 5, entry.document_value.as_deref().unwrap_or_default())?;
        if let Some(difference) = entry.numeric_difference {
            sheet.write_number(row, 6, difference)?;
        }
        sheet.write_string(row, 7, &entry.description)?;
    }

    Ok(())
}

fn write_summary(
    sheet: &mut Worksheet,
    summary: &ReportSummary,
    header: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let metrics: [(&str, f64); 10] = [
        ("Total Documents", summary.total_documents as f64),
        ("Clean", summary.clean as f64),
        ("Data Error", summary.data_error as f64),
        ("Identifier Not Found", summary.identifier_not_found as f64),
        ("Identifier Unmatched", summary.identifier_unmatched as f64),
        ("Processing Error", summary.processing_error as f64),
        ("Total Discrepancies", summary.total_discrepancies as f64),
        ("Total Amount Difference", round_cents(summary.total_amount_difference)),
        ("Average Discrepancy", round_cents(summary.average_amount_difference)),
        ("Max Discrepancy", round_cents(summary.max_amount_difference)),
    ];

    sheet.write_string_with_format(0, 0, "Metric", header)?;
    sheet.write_string_with_format(0, 1, "Value", header)?;
    for (index, (metric, value)) in metrics.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, *metric)?;
        sheet.write_number(row, 1, *value)?;
    }

    Ok(())
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
