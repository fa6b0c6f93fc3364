mod answer;
mod ids;
mod question;
mod quiz_config;
mod summary;

pub use answer::{AnswerRecord, AnswerVerdict};
pub use ids::QuestionId;
pub use question::{Difficulty, ParseLabelError, Question, QuestionDraft, QuestionError, QuestionKind};
pub use quiz_config::{
    is_placeholder_api_key, ConfigField, FeatureFlags, QuestionMode, QuizConfig, QuizConfigDraft,
    QuizConfigError, RuntimeEnv, DEFAULT_API_BASE_URL, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RETRY_DELAY_MS,
};
pub use summary::{QuizSummary, QuizSummaryError};
