mod cancel;
mod entities;
mod fallback;
mod http;
mod source;

// Public API of the question subsystem.
pub use cancel::CancelToken;
pub use entities::decode_html_entities;
pub use fallback::FallbackQuestions;
pub use http::{
    API_CODE_RATE_LIMIT, FetchRequest, HttpQuestionFetcher, MAX_AMOUNT, QuestionFetcher,
};
pub use source::{FallbackReason, LoadedQuestions, QuestionOrigin, QuestionSource};
