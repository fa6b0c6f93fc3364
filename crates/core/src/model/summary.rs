use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{AnswerRecord, AnswerVerdict};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many answers for a single session: {len}")]
    TooManyAnswers { len: usize },

    #[error("total questions ({total}) does not match verdict counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Aggregate result of a completed quiz session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizSummary {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_questions: u32,
    correct: u32,
    incorrect: u32,
    timed_out: u32,
}

impl QuizSummary {
    /// Build a summary from explicit counts.
    ///
    /// # Errors
    ///
    /// Returns `QuizSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `QuizSummaryError::CountMismatch` if totals do not align.
    pub fn new(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_questions: u32,
        correct: u32,
        incorrect: u32,
        timed_out: u32,
    ) -> Result<Self, QuizSummaryError> {
        if completed_at < started_at {
            return Err(QuizSummaryError::InvalidTimeRange);
        }
        let sum = correct
            .saturating_add(incorrect)
            .saturating_add(timed_out);
        if sum != total_questions {
            return Err(QuizSummaryError::CountMismatch {
                total: total_questions,
                sum,
            });
        }

        Ok(Self {
            started_at,
            completed_at,
            total_questions,
            correct,
            incorrect,
            timed_out,
        })
    }

    /// Build a summary from the answer records of a session.
    ///
    /// # Errors
    ///
    /// Returns `QuizSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `QuizSummaryError::TooManyAnswers` if the record count cannot fit in `u32`.
    pub fn from_records(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        records: &[AnswerRecord],
    ) -> Result<Self, QuizSummaryError> {
        let mut correct = 0_u32;
        let mut incorrect = 0_u32;
        let mut timed_out = 0_u32;

        for record in records {
            match record.verdict {
                AnswerVerdict::Correct => correct = correct.saturating_add(1),
                AnswerVerdict::Incorrect => incorrect = incorrect.saturating_add(1),
                AnswerVerdict::TimedOut => timed_out = timed_out.saturating_add(1),
            }
        }

        let total_questions = u32::try_from(records.len())
            .map_err(|_| QuizSummaryError::TooManyAnswers { len: records.len() })?;

        Self::new(
            started_at,
            completed_at,
            total_questions,
            correct,
            incorrect,
            timed_out,
        )
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.completed_at - self.started_at
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn timed_out(&self) -> u32 {
        self.timed_out
    }

    /// Share of correct answers in `0.0..=100.0`; zero for an empty session.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.correct) * 100.0 / f64::from(self.total_questions)
    }
}
