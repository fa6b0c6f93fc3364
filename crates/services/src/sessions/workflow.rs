use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use quiz_core::Clock;
use quiz_core::model::{Difficulty, QuestionId, QuizSummary};

use super::progress::SessionProgress;
use super::service::{AnswerOutcome, QuizSession, SessionPhase};
use crate::error::SessionError;
use crate::questions::{CancelToken, LoadedQuestions, MAX_AMOUNT, QuestionOrigin, QuestionSource};

/// A freshly started session and where its questions came from.
#[derive(Debug)]
pub struct Round {
    pub session: QuizSession,
    pub origin: QuestionOrigin,
}

impl Round {
    /// Non-blocking notice for the player when questions are not live.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        self.origin.notice()
    }
}

/// Result of answering the current question in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub outcome: AnswerOutcome,
    pub progress: SessionProgress,
}

/// Result of moving past an answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceResult {
    pub phase: SessionPhase,
    /// Present once the session is complete.
    pub summary: Option<QuizSummary>,
}

/// Orchestrates question loading and session flow for a front end.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    source: Arc<QuestionSource>,
    time_limit: Option<Duration>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<QuestionSource>) -> Self {
        Self {
            clock,
            source,
            time_limit: None,
        }
    }

    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    #[must_use]
    pub fn source(&self) -> &QuestionSource {
        &self.source
    }

    /// An idle session configured like the ones this service starts.
    #[must_use]
    pub fn new_session(&self) -> QuizSession {
        let session = QuizSession::new(self.clock);
        match self.time_limit {
            Some(limit) => session.with_time_limit(limit),
            None => session,
        }
    }

    /// Load questions and start a session over them.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LoadCancelled` if `cancel` fired during loading.
    /// Returns `SessionError::InvalidInput` if no questions could be loaded.
    pub async fn start_round(
        &self,
        count: usize,
        difficulty: Option<Difficulty>,
        cancel: &CancelToken,
    ) -> Result<Round, SessionError> {
        self.start_round_excluding(count, difficulty, &HashSet::new(), cancel)
            .await
    }

    /// Like `start_round`, preferring questions whose ids are not in `seen`.
    ///
    /// Over-fetches to make up for filtered questions. Falls back to repeats
    /// when every loaded question has been seen.
    ///
    /// # Errors
    ///
    /// Same as [`QuizLoopService::start_round`].
    pub async fn start_round_excluding(
        &self,
        count: usize,
        difficulty: Option<Difficulty>,
        seen: &HashSet<QuestionId>,
        cancel: &CancelToken,
    ) -> Result<Round, SessionError> {
        let request = count.saturating_add(seen.len()).min(MAX_AMOUNT);
        let loaded = self
            .source
            .load_questions(request, difficulty, cancel)
            .await;

        if loaded.origin == QuestionOrigin::Cancelled {
            return Err(SessionError::LoadCancelled);
        }
        if let Some(notice) = loaded.notice() {
            tracing::warn!(%notice, "starting round without live questions");
        }

        let LoadedQuestions { questions, origin } = loaded;
        let (fresh, repeats): (Vec<_>, Vec<_>) = questions
            .into_iter()
            .partition(|question| !seen.contains(&question.id()));
        let mut picked = if fresh.is_empty() { repeats } else { fresh };
        picked.truncate(count);

        let mut session = self.new_session();
        let total = session.start_session(picked)?;
        tracing::info!(total, ?difficulty, ?origin, "round started");

        Ok(Round { session, origin })
    }

    /// Answer the current question.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError` from the session; state is unchanged on error.
    pub fn answer(
        &self,
        session: &mut QuizSession,
        choice_index: usize,
    ) -> Result<AnswerResult, SessionError> {
        let outcome = session.submit_answer(choice_index)?;
        Ok(AnswerResult {
            outcome,
            progress: session.progress(),
        })
    }

    /// Mark the current question as timed out.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError` from the session; state is unchanged on error.
    pub fn expire(&self, session: &mut QuizSession) -> Result<AnswerResult, SessionError> {
        let outcome = session.expire_current()?;
        Ok(AnswerResult {
            outcome,
            progress: session.progress(),
        })
    }

    /// Move to the next question, building the summary when the round ends.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError` from the session; state is unchanged on error.
    pub fn advance(&self, session: &mut QuizSession) -> Result<AdvanceResult, SessionError> {
        let phase = session.next()?;
        let summary = if phase == SessionPhase::Complete {
            let summary = session.summary()?;
            tracing::info!(
                correct = summary.correct(),
                total = summary.total_questions(),
                "round complete"
            );
            Some(summary)
        } else {
            None
        };
        Ok(AdvanceResult { phase, summary })
    }
}

#[cfg(test)]
mod tests {
    use quiz_core::model::{AnswerVerdict, QuizConfig};
    use quiz_core::time::{fixed_clock, fixed_now};

    use crate::questions::FallbackQuestions;

    use super::*;

    fn offline_service() -> QuizLoopService {
        let source = QuestionSource::from_config(QuizConfig::default());
        QuizLoopService::new(fixed_clock(), Arc::new(source))
    }

    #[tokio::test]
    async fn round_uses_fallback_without_api_key() {
        let service = offline_service();
        let round = service
            .start_round(5, Some(Difficulty::Medium), &CancelToken::new())
            .await
            .unwrap();

        assert!(matches!(round.origin, QuestionOrigin::Fallback { .. }));
        assert!(round.notice().is_some());
        assert_eq!(round.session.questions().len(), 5);
        assert_eq!(round.session.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn cancelled_round_is_an_error() {
        let service = offline_service();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = service.start_round(3, None, &cancel).await.unwrap_err();
        assert_eq!(err, SessionError::LoadCancelled);
    }

    #[tokio::test]
    async fn zero_count_round_is_invalid_input() {
        let service = offline_service();
        let err = service
            .start_round(0, None, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::InvalidInput);
    }

    #[tokio::test]
    async fn excluding_seen_prefers_new_questions() {
        let service = offline_service();
        let first = service
            .start_round(5, Some(Difficulty::Easy), &CancelToken::new())
            .await
            .unwrap();
        let seen: HashSet<QuestionId> = first.session.questions().iter().map(|q| q.id()).collect();

        let second = service
            .start_round_excluding(5, Some(Difficulty::Easy), &seen, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(second.session.questions().len(), 5);
        assert!(
            second
                .session
                .questions()
                .iter()
                .all(|q| !seen.contains(&q.id()))
        );
    }

    #[tokio::test]
    async fn advance_summarizes_session_started_in_the_future() {
        let service = offline_service();
        let questions = FallbackQuestions::bundled().select(1, None, &mut rand::rng());
        let mut session = service.new_session();
        session
            .start_session_at(questions, fixed_now() + Duration::seconds(10))
            .unwrap();

        let correct = session.current_question().unwrap().correct_index();
        service.answer(&mut session, correct).unwrap();
        let done = service.advance(&mut session).unwrap();

        assert_eq!(done.phase, SessionPhase::Complete);
        assert_eq!(done.summary.unwrap().correct(), 1);
    }

    #[tokio::test]
    async fn answer_and_advance_through_round() {
        let service = offline_service().with_time_limit(Some(Duration::seconds(30)));
        let mut round = service
            .start_round(3, None, &CancelToken::new())
            .await
            .unwrap();
        let session = &mut round.session;
        assert_eq!(session.time_limit(), Some(Duration::seconds(30)));

        let correct = session.current_question().unwrap().correct_index();
        let result = service.answer(session, correct).unwrap();
        assert_eq!(result.outcome.verdict, AnswerVerdict::Correct);
        assert_eq!(result.progress.answered, 1);
        assert!(service.advance(session).unwrap().summary.is_none());

        service.expire(session).unwrap();
        assert!(service.advance(session).unwrap().summary.is_none());

        let current = session.current_question().unwrap();
        let wrong = (current.correct_index() + 1) % current.choices().len();
        service.answer(session, wrong).unwrap();
        let done = service.advance(session).unwrap();

        assert_eq!(done.phase, SessionPhase::Complete);
        let summary = done.summary.unwrap();
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.incorrect(), 1);
        assert_eq!(summary.timed_out(), 1);
    }
}
