//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use quiz_core::model::QuizSummaryError;

use crate::sessions::SessionPhase;

/// Errors emitted while fetching questions from the trivia API.
///
/// These never escape `QuestionSource`; they are logged and carried as text in
/// the fallback reason.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("trivia API request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("trivia API response code {code}: {message}")]
    Api { code: u8, message: &'static str },
    #[error("trivia API returned no usable questions")]
    EmptyResponse,
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::HttpStatus(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Http(err) => !(err.is_decode() || err.is_builder()),
            FetchError::Api { code, .. } => *code == crate::questions::API_CODE_RATE_LIMIT,
            FetchError::EmptyResponse => false,
        }
    }
}

/// Errors emitted by the session controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot start a session without questions")]
    InvalidInput,
    #[error("question loading was cancelled")]
    LoadCancelled,
    #[error("`{operation}` is not allowed while the session is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: SessionPhase,
    },
    #[error("choice {choice} is out of range for {len} choices")]
    ChoiceOutOfRange { choice: usize, len: usize },
    #[error(transparent)]
    Summary(#[from] QuizSummaryError),
}
