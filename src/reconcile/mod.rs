use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::compare::{ComparisonService, DiscrepancyExtractor};
use crate::config::ReconcileConfig;
use crate::error::DocumentError;
use crate::extract::DocumentExtractor;
use crate::identifier::IdentifierResolver;
use crate::model::{
    BatchReport, DiscrepancyEntry, DocumentFacts, ExtractedDocument, OutcomeStatus,
    ReconciliationOutcome,
};
use crate::reference::ReferenceIndex;
use crate::util::sha256_bytes;

mod input;

pub use input::*;

/// Drives each document through extraction, identifier resolution,
/// reference matching and comparison. Every input produces exactly one
/// outcome; nothing a single document does can abort the batch.
///
/// Without a comparison service the run stops after reference matching
/// (dry run) and matched documents are reported as clean.
pub struct BatchReconciler<'a> {
    config: &'a ReconcileConfig,
    reference: &'a ReferenceIndex,
    service: Option<&'a dyn ComparisonService>,
    extractor: DocumentExtractor,
    resolver: IdentifierResolver,
    discrepancies: DiscrepancyExtractor<'a>,
}

impl<'a> BatchReconciler<'a> {
    pub fn new(
        config: &'a ReconcileConfig,
        reference: &'a ReferenceIndex,
        service: Option<&'a dyn ComparisonService>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            reference,
            service,
            extractor: DocumentExtractor::new()?,
            resolver: IdentifierResolver::new()?,
            discrepancies: DiscrepancyExtractor::new(config)?,
        })
    }

    pub fn run(&self, inputs: Vec<DocumentInput>) -> BatchReport {
        let total = inputs.len();
        let mut report = BatchReport::new();

        for (position, input) in inputs.into_iter().enumerate() {
            info!(
                document = %input.source_file,
                position = position + 1,
                total,
                "processing document"
            );
            let outcome = self.process(input);
            log_outcome(&outcome);
            report.push(outcome);
        }

        report
    }

    fn process(&self, input: DocumentInput) -> ReconciliationOutcome {
        let mut facts = DocumentFacts::default();
        let result = match &input.data {
            Ok(data) => {
                facts.size_bytes = data.len() as u64;
                facts.sha256 = Some(sha256_bytes(data));
                self.validate(&input.source_file, data.len() as u64)
                    .and_then(|()| self.extractor.extract(data, &input.source_file))
            }
            Err(message) => Err(DocumentError::ExtractionFailure(message.clone())),
        };

        match result {
            Ok(document) => {
                facts.page_count = Some(document.page_count);
                let mut outcome = self.reconcile_document(document);
                outcome.facts = facts;
                outcome
            }
            Err(err) => failed_outcome(input.source_file, None, err, facts),
        }
    }

    fn validate(&self, source_file: &str, size_bytes: u64) -> Result<(), DocumentError> {
        if !has_pdf_extension(Path::new(source_file)) {
            return Err(DocumentError::UnsupportedDocument(format!(
                "{source_file} is not a .pdf file"
            )));
        }
        if size_bytes > self.config.max_file_size {
            return Err(DocumentError::UnsupportedDocument(format!(
                "{source_file} is {size_bytes} bytes, limit is {}",
                self.config.max_file_size
            )));
        }
        Ok(())
    }

    /// Runs the stages after extraction on an already-extracted document.
    pub fn reconcile_document(&self, mut document: ExtractedDocument) -> ReconciliationOutcome {
        let facts = DocumentFacts {
            page_count: Some(document.page_count),
            ..DocumentFacts::default()
        };

        let Some(identifier) = self.resolver.resolve(&document.text) else {
            return failed_outcome(
                document.source_file,
                None,
                DocumentError::IdentifierNotFound,
                facts,
            );
        };
        document.identifier = Some(identifier.clone());

        match self.compare(&document, &identifier) {
            Ok(discrepancies) => ReconciliationOutcome {
                source_file: document.source_file,
                identifier: Some(identifier),
                status: if discrepancies.is_empty() {
                    OutcomeStatus::Clean
                } else {
                    OutcomeStatus::DataError
                },
                discrepancies,
                error: None,
                facts,
            },
            Err(err) => failed_outcome(document.source_file, Some(identifier), err, facts),
        }
    }

    fn compare(
        &self,
        document: &ExtractedDocument,
        identifier: &str,
    ) -> Result<Vec<DiscrepancyEntry>, DocumentError> {
        let record = self
            .reference
            .first(identifier)
            .ok_or_else(|| DocumentError::ReferenceNotFound(identifier.to_string()))?;
        debug!(
            document = %document.source_file,
            identifier,
            row = record.row_number,
            "matched reference record"
        );

        match self.service {
            Some(service) => {
                self.discrepancies
                    .extract(service, document, record, self.reference)
            }
            None => Ok(Vec::new()),
        }
    }
}

fn failed_outcome(
    source_file: String,
    identifier: Option<String>,
    err: DocumentError,
    facts: DocumentFacts,
) -> ReconciliationOutcome {
    ReconciliationOutcome {
        source_file,
        identifier,
        status: err.status(),
        discrepancies: Vec::new(),
        error: Some(err.to_string()),
        facts,
    }
}

fn log_outcome(outcome: &ReconciliationOutcome) {
    let identifier = outcome.identifier.as_deref().unwrap_or("-");
    match outcome.status {
        OutcomeStatus::Clean => info!(
            document = %outcome.source_file,
            identifier,
            "no discrepancies"
        ),
        OutcomeStatus::DataError => warn!(
            document = %outcome.source_file,
            identifier,
            discrepancies = outcome.discrepancies.len(),
            "data errors found"
        ),
        status => warn!(
            document = %outcome.source_file,
            identifier,
            status = status.label(),
            error = %outcome.error.as_deref().unwrap_or_default(),
            "document not reconciled"
        ),
    }
}
