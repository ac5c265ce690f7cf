use thiserror::Error;

use crate::model::OutcomeStatus;

/// Failures of the comparison service call itself.
#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ComparisonError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Per-document failures. Each one ends that document's pipeline and becomes
/// its outcome; none of them abort the batch.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),
    #[error("extraction failure: {0}")]
    ExtractionFailure(String),
    #[error("identifier not found in document")]
    IdentifierNotFound,
    #[error("identifier {0} not found in reference data")]
    ReferenceNotFound(String),
    #[error("comparison service failure: {0}")]
    ComparisonServiceFailure(#[from] ComparisonError),
    #[error("response parse failure: {0}")]
    ResponseParseFailure(String),
}

impl DocumentError {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::IdentifierNotFound => OutcomeStatus::IdentifierNotFound,
            Self::ReferenceNotFound(_) => OutcomeStatus::IdentifierUnmatched,
            Self::UnsupportedDocument(_)
            | Self::ExtractionFailure(_)
            | Self::ComparisonServiceFailure(_)
            | Self::ResponseParseFailure(_) => OutcomeStatus::ProcessingError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkage_failures_map_to_their_own_statuses() {
        assert_eq!(
            DocumentError::IdentifierNotFound.status(),
            OutcomeStatus::IdentifierNotFound
        );
        assert_eq!(
            DocumentError::ReferenceNotFound("123".to_string()).status(),
            OutcomeStatus::IdentifierUnmatched
        );
    }

    #[test]
    fn service_failures_are_processing_errors() {
        let err = DocumentError::from(ComparisonError::Api {
            status: 401,
            message: "bad key".to_string(),
        });
        assert_eq!(err.status(), OutcomeStatus::ProcessingError);
        assert_eq!(
            err.to_string(),
            "comparison service failure: api error (401): bad key"
        );
    }
}
