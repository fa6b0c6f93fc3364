#![forbid(unsafe_code)]

pub mod app_services;
pub mod config_loader;
pub mod error;
pub mod questions;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use config_loader::{ConfigLoader, LoadedConfig};
pub use error::{FetchError, SessionError};
pub use questions::{
    CancelToken, FallbackQuestions, FallbackReason, HttpQuestionFetcher, LoadedQuestions,
    QuestionFetcher, QuestionOrigin, QuestionSource,
};
pub use sessions::{
    AdvanceResult, AnswerOutcome, AnswerResult, QuizLoopService, QuizSession, Round,
    SessionPhase, SessionProgress,
};
