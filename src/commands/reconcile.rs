use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::cli::ReconcileArgs;
use crate::compare::{ComparisonService, OpenAiService};
use crate::config::{ReconcileConfig, ServiceConfig};
use crate::model::{BatchReport, ReconcileRunManifest, RunArtifacts};
use crate::reconcile::{BatchReconciler, DocumentInput, discover_pdfs};
use crate::reference::ReferenceIndex;
use crate::report::{
    ReportSummary, error_rows, log_summary, report_rows, summarize, write_discrepancy_xlsx,
    write_report_csv,
};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: ReconcileArgs) -> Result<()> {
    let started = Utc::now();
    let started_at = started.to_rfc3339_opts(SecondsFormat::Secs, true);
    let timestamp = utc_compact_string(started);

    let config = ReconcileConfig::from_args(&args)?;
    let service = if args.dry_run {
        None
    } else {
        Some(OpenAiService::new(ServiceConfig::from_args(
            &args.service,
            args.timeout_secs,
        )?)?)
    };

    let reference = ReferenceIndex::load(&args.reference, &config.identifier_column)?;

    let paths = collect_documents(&args)?;
    if paths.is_empty() {
        bail!("no documents to reconcile: pass --documents <dir> and/or document paths");
    }
    info!(
        documents = paths.len(),
        mode = config.parse_mode.as_str(),
        model = %config.model,
        dry_run = args.dry_run,
        "starting reconciliation"
    );

    let inputs = paths
        .iter()
        .map(|path| DocumentInput::read(path))
        .collect::<Vec<DocumentInput>>();
    let report = {
        let service = service
            .as_ref()
            .map(|service| service as &dyn ComparisonService);
        BatchReconciler::new(&config, &reference, service)?.run(inputs)
    };
    let summary = summarize(&report);

    if args.dry_run {
        info!(
            documents = summary.total_documents,
            matched = summary.clean,
            identifier_not_found = summary.identifier_not_found,
            identifier_unmatched = summary.identifier_unmatched,
            processing_errors = summary.processing_error,
            "reconcile dry-run complete"
        );
        return Ok(());
    }

    let artifacts = write_artifacts(&args.output_dir, &timestamp, &report, &summary)?;
    log_summary(&report, &summary);

    let manifest = ReconcileRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: format!("reconcile-{timestamp}"),
        started_at,
        completed_at: now_utc_string(),
        reference_path: reference.source().to_string(),
        reference_record_count: reference.len(),
        reference_duplicate_identifiers: reference.duplicate_identifier_count(),
        config,
        summary,
        artifacts,
        outcomes: report.outcomes().to_vec(),
    };
    let manifest_path = args
        .output_dir
        .join(format!("reconcile_run_{timestamp}.json"));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");

    Ok(())
}

/// Directory listing first (sorted), then explicitly named files in the
/// order given.
fn collect_documents(args: &ReconcileArgs) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    if let Some(directory) = &args.documents {
        let discovered = discover_pdfs(directory)?;
        if discovered.is_empty() {
            warn!(path = %directory.display(), "no PDFs found in documents directory");
        }
        paths.extend(discovered);
    }
    paths.extend(args.files.iter().cloned());

    Ok(paths)
}

fn write_artifacts(
    output_dir: &Path,
    timestamp: &str,
    report: &BatchReport,
    summary: &ReportSummary,
) -> Result<RunArtifacts> {
    ensure_directory(output_dir)?;

    let full_report = output_dir.join(format!("validation_report_{timestamp}.csv"));
    write_report_csv(&full_report, &report_rows(report))?;
    info!(path = %full_report.display(), "wrote validation report");

    let errors = error_rows(report);
    let errors_only = if errors.is_empty() {
        info!("all documents clean; errors-only report skipped");
        None
    } else {
        let path = output_dir.join(format!("errors_only_{timestamp}.csv"));
        write_report_csv(&path, &errors)?;
        info!(path = %path.display(), rows = errors.len(), "wrote errors-only report");
        Some(path)
    };

    let workbook = output_dir.join(format!("discrepancy_report_{timestamp}.xlsx"));
    write_discrepancy_xlsx(&workbook, report, summary)?;
    info!(path = %workbook.display(), "wrote discrepancy workbook");

    Ok(RunArtifacts {
        full_report_csv: full_report.display().to_string(),
        errors_only_csv: errors_only.map(|path| path.display().to_string()),
        discrepancy_xlsx: workbook.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentFacts, OutcomeStatus, ReconciliationOutcome};

    fn outcome(source_file: &str, status: OutcomeStatus) -> ReconciliationOutcome {
        ReconciliationOutcome {
            source_file: source_file.to_string(),
            identifier: Some("1".to_string()),
            status,
            discrepancies: Vec::new(),
            error: None,
            facts: DocumentFacts::default(),
        }
    }

    #[test]
    fn clean_batch_skips_errors_only_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = BatchReport::new();
        report.push(outcome("a.pdf", OutcomeStatus::Clean));

        let artifacts =
            write_artifacts(dir.path(), "20260101T000000Z", &report, &summarize(&report)).unwrap();

        assert!(artifacts.errors_only_csv.is_none());
        assert!(dir.path().join("validation_report_20260101T000000Z.csv").is_file());
        assert!(dir.path().join("discrepancy_report_20260101T000000Z.xlsx").is_file());
        assert!(!dir.path().join("errors_only_20260101T000000Z.csv").exists());
    }

    #[test]
    fn failed_documents_get_errors_only_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = BatchReport::new();
        report.push(outcome("a.pdf", OutcomeStatus::Clean));
        report.push(outcome("b.pdf", OutcomeStatus::ProcessingError));

        let artifacts =
            write_artifacts(dir.path(), "20260101T000000Z", &report, &summarize(&report)).unwrap();

        let errors_only = artifacts.errors_only_csv.unwrap();
        let written = std::fs::read_to_string(errors_only).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.contains("b.pdf"));
    }
}
