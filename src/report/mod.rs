use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{BatchReport, OutcomeStatus, ReconciliationOutcome};

mod writers;

pub use writers::*;

pub const IDENTIFIER_NOT_FOUND_LABEL: &str = "Not Found";
/// Identifier cell for documents that failed before an identifier was read.
pub const PROCESSING_ERROR_LABEL: &str = "Error";
pub const CLEAN_DESCRIPTION: &str = "No discrepancies";

/// Batch aggregates. Amount statistics cover only entries that carry a
/// numeric difference and are taken over absolute values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_documents: usize,
    pub clean: usize,
    pub data_error: usize,
    pub identifier_not_found: usize,
    pub identifier_unmatched: usize,
    pub processing_error: usize,
    pub total_discrepancies: usize,
    pub total_amount_difference: f64,
    pub average_amount_difference: f64,
    pub max_amount_difference: f64,
}

impl ReportSummary {
    pub fn count(&self, status: OutcomeStatus) -> usize {
        match status {
            OutcomeStatus::Clean => self.clean,
            OutcomeStatus::DataError => self.data_error,
            OutcomeStatus::IdentifierNotFound => self.identifier_not_found,
            OutcomeStatus::IdentifierUnmatched => self.identifier_unmatched,
            OutcomeStatus::ProcessingError => self.processing_error,
        }
    }

    /// Documents that could not be checked at all.
    pub fn failed(&self) -> usize {
        OutcomeStatus::ALL
            .into_iter()
            .filter(|status| status.is_failure())
            .map(|status| self.count(status))
            .sum()
    }
}

pub fn summarize(report: &BatchReport) -> ReportSummary {
    let mut summary = ReportSummary {
        total_documents: report.len(),
        ..ReportSummary::default()
    };

    for outcome in report.outcomes() {
        match outcome.status {
            OutcomeStatus::Clean => summary.clean += 1,
            OutcomeStatus::DataError => summary.data_error += 1,
            OutcomeStatus::IdentifierNotFound => summary.identifier_not_found += 1,
            OutcomeStatus::IdentifierUnmatched => summary.identifier_unmatched += 1,
            OutcomeStatus::ProcessingError => summary.processing_error += 1,
        }
    }

    let differences = report
        .discrepancies()
        .filter_map(|entry| entry.numeric_difference)
        .map(f64::abs)
        .collect::<Vec<f64>>();

    summary.total_discrepancies = report.discrepancies().count();
    summary.total_amount_difference = differences.iter().sum();
    summary.max_amount_difference = differences.iter().copied().fold(0.0, f64::max);
    if !differences.is_empty() {
        summary.average_amount_difference =
            summary.total_amount_difference / differences.len() as f64;
    }

    summary
}

/// One line of the per-document report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Identifier")]
    pub identifier: String,
    #[serde(rename = "PDF File")]
    pub source_file: String,
    #[serde(rename = "Status")]
    pub status: &'static str,
    #[serde(rename = "Data Errors")]
    pub description: String,
}

impl ReportRow {
    pub fn from_outcome(outcome: &ReconciliationOutcome) -> Self {
        let description = match (&outcome.error, outcome.discrepancies.is_empty()) {
            (Some(error), _) => error.clone(),
            (None, true) => CLEAN_DESCRIPTION.to_string(),
            (None, false) => outcome
                .discrepancies
                .iter()
                .map(|entry| entry.description.as_str())
                .collect::<Vec<&str>>()
                .join("; "),
        };

        let identifier = match (&outcome.identifier, outcome.status) {
            (Some(identifier), _) => identifier.clone(),
            (None, OutcomeStatus::ProcessingError) => PROCESSING_ERROR_LABEL.to_string(),
            (None, _) => IDENTIFIER_NOT_FOUND_LABEL.to_string(),
        };

        Self {
            identifier,
            source_file: outcome.source_file.clone(),
            status: outcome.status.label(),
            description,
        }
    }
}

pub fn report_rows(report: &BatchReport) -> Vec<ReportRow> {
    report.outcomes().iter().map(ReportRow::from_outcome).collect()
}

/// Rows for every document that is not clean.
pub fn error_rows(report: &BatchReport) -> Vec<ReportRow> {
    report
        .outcomes()
        .iter()
        .filter(|outcome| outcome.status != OutcomeStatus::Clean)
        .map(ReportRow::from_outcome)
        .collect()
}

pub fn log_summary(report: &BatchReport, summary: &ReportSummary) {
    info!(
        documents = summary.total_documents,
        clean = summary.clean,
        data_errors = summary.data_error,
        failed = summary.failed(),
        discrepancies = summary.total_discrepancies,
        "reconciliation summary"
    );

    for status in OutcomeStatus::ALL {
        let count = summary.count(status);
        if count > 0 {
            info!(status = status.label(), count, "documents by status");
        }
    }

    if summary.total_amount_difference > 0.0 {
        info!(
            total = %format!("{:.2}", summary.total_amount_difference),
            average = %format!("{:.2}", summary.average_amount_difference),
            max = %format!("{:.2}", summary.max_amount_difference),
            "amount differences"
        );
    }

    for outcome in report
        .outcomes()
        .iter()
        .filter(|outcome| outcome.status == OutcomeStatus::DataError)
    {
        let row = ReportRow::from_outcome(outcome);
        warn!(
            document = %row.source_file,
            identifier = %row.identifier,
            errors = %row.description,
            "document has data errors"
        );
    }
}
