use std::path::PathBuf;

use thiserror::Error;

use crate::llm_client::LlmError;

/// Failure of a single candidate evaluation.
/// Every variant is fatal for that candidate only; the batch carries on.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document is empty: {}", path.display())]
    EmptyDocument { path: PathBuf },

    #[error("Evaluation service could not be initialised: {0}")]
    ServiceInit(String),

    #[error("Evaluation service call failed: {0}")]
    ServiceCall(String),

    #[error("Evaluation service returned no text")]
    EmptyResponse,

    #[error("Malformed evaluation response ({reason}): {raw}")]
    MalformedResponse { reason: String, raw: String },

    #[error("Response carries no usable match_score")]
    ScoreMissing,

    #[error("Failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EvaluationError {
    /// Short stable label used in the run manifest.
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationError::NotFound { .. } => "not_found",
            EvaluationError::ReadError { .. } => "read_error",
            EvaluationError::EmptyDocument { .. } => "empty_document",
            EvaluationError::ServiceInit(_) => "service_init",
            EvaluationError::ServiceCall(_) => "service_call",
            EvaluationError::EmptyResponse => "empty_response",
            EvaluationError::MalformedResponse { .. } => "malformed_response",
            EvaluationError::ScoreMissing => "score_missing",
            EvaluationError::Persist { .. } => "persist",
        }
    }
}

impl From<LlmError> for EvaluationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Init(msg) => EvaluationError::ServiceInit(msg),
            LlmError::EmptyContent => EvaluationError::EmptyResponse,
            other => EvaluationError::ServiceCall(other.to_string()),
        }
    }
}
