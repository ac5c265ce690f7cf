use anyhow::Result;
use tracing::{debug, warn};

use crate::cli::ParseMode;
use crate::config::ReconcileConfig;
use crate::error::{ComparisonError, DocumentError};
use crate::model::{DiscrepancyEntry, ExtractedDocument, ReferenceRecord};
use crate::reference::ReferenceIndex;

mod openai;
mod parse;
mod prompt;
#[cfg(test)]
mod tests;

pub use openai::OpenAiService;

use parse::*;
use prompt::*;

/// One stateless request to the comparison model: a role-tagged instruction
/// plus the user payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The external comparison capability. Implementations return the raw
/// response text; interpreting it is the extractor's job.
pub trait ComparisonService {
    fn compare(&self, request: &ComparisonRequest) -> Result<String, ComparisonError>;
}

/// Builds the bounded prompt for one document, calls the service once and
/// parses the reply into discrepancy entries. An empty result means clean.
pub struct DiscrepancyExtractor<'a> {
    config: &'a ReconcileConfig,
    parser: ResponseParser,
}

impl<'a> DiscrepancyExtractor<'a> {
    pub fn new(config: &'a ReconcileConfig) -> Result<Self> {
        Ok(Self {
            config,
            parser: ResponseParser::new()?,
        })
    }

    pub fn build_request(
        &self,
        document: &ExtractedDocument,
        record: &ReferenceRecord,
        reference: &ReferenceIndex,
    ) -> ComparisonRequest {
        let (system, user) = match self.config.parse_mode {
            ParseMode::FreeText => (
                free_text_policy(),
                free_text_payload(document, record, self.config.text_limit),
            ),
            ParseMode::Structured => (
                structured_policy(),
                structured_payload(
                    document,
                    record,
                    reference.sample(self.config.reference_sample_rows),
                    self.config.text_limit,
                ),
            ),
        };

        ComparisonRequest {
            system,
            user,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    pub fn extract(
        &self,
        service: &dyn ComparisonService,
        document: &ExtractedDocument,
        record: &ReferenceRecord,
        reference: &ReferenceIndex,
    ) -> Result<Vec<DiscrepancyEntry>, DocumentError> {
        let request = self.build_request(document, record, reference);
        debug!(
            source = %document.source_file,
            mode = self.config.parse_mode.as_str(),
            payload_chars = request.user.chars().count(),
            "sending comparison request"
        );

        let response = service.compare(&request)?;
        let context = EntryContext {
            source_file: &document.source_file,
            identifier: document.identifier.as_deref(),
        };

        if is_no_discrepancy_sentinel(&response) {
            return Ok(Vec::new());
        }

        match self.config.parse_mode {
            ParseMode::FreeText => Ok(self.parser.parse_free_text(&response, &context)),
            ParseMode::Structured => {
                parse_structured(&response, &context).inspect_err(|err| {
                    warn!(
                        source = %document.source_file,
                        error = %err,
                        response = %response,
                        "discarding unparseable structured response"
                    );
                })
            }
        }
    }
}
