use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::QuestionId;

/// How a single question was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerVerdict {
    Correct,
    Incorrect,
    /// The time limit ran out before a choice was accepted.
    TimedOut,
}

impl AnswerVerdict {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Record of one answered question within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    /// `None` when the question expired without a choice.
    pub choice: Option<usize>,
    pub verdict: AnswerVerdict,
    pub answered_at: DateTime<Utc>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        choice: Option<usize>,
        verdict: AnswerVerdict,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question_id,
            choice,
            verdict,
            answered_at,
        }
    }
}
