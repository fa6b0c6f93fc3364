use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::Clock;
use quiz_core::model::{AnswerRecord, AnswerVerdict, Question, QuestionId, QuizSummary};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Externally visible state of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active,
    Answered,
    Complete,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Answered => "answered",
            Self::Complete => "complete",
        })
    }
}

/// Internal state. The question pointer only exists while a question is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Active {
        index: usize,
        shown_at: DateTime<Utc>,
    },
    Answered {
        index: usize,
    },
    Complete {
        completed_at: DateTime<Utc>,
    },
}

impl State {
    fn phase(self) -> SessionPhase {
        match self {
            State::Idle => SessionPhase::Idle,
            State::Active { .. } => SessionPhase::Active,
            State::Answered { .. } => SessionPhase::Answered,
            State::Complete { .. } => SessionPhase::Complete,
        }
    }

    fn index(self) -> Option<usize> {
        match self {
            State::Active { index, .. } | State::Answered { index } => Some(index),
            State::Idle | State::Complete { .. } => None,
        }
    }
}

//
// ─── ANSWER OUTCOME ────────────────────────────────────────────────────────────
//

/// Result of resolving the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub choice: Option<usize>,
    pub verdict: AnswerVerdict,
    pub correct_index: usize,
    /// Score after this answer.
    pub score: u32,
    /// True when this was the last question of the session.
    pub is_last: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through a bounded list of questions.
///
/// Transitions: `Idle → Active → Answered → Active | Complete`. Any call made
/// in the wrong phase returns `SessionError::InvalidPhase` and leaves the
/// session untouched. `start_session` may be called again at any time to
/// restart with a new question list.
pub struct QuizSession {
    clock: Clock,
    time_limit: Option<Duration>,
    questions: Vec<Question>,
    state: State,
    score: u32,
    records: Vec<AnswerRecord>,
    started_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Create an idle session. `clock` drives the session and per-question timers.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            time_limit: None,
            questions: Vec::new(),
            state: State::Idle,
            score: 0,
            records: Vec::new(),
            started_at: None,
        }
    }

    /// Answers accepted after `limit` on a question count as timed out.
    #[must_use]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete { .. })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    /// Ids of answered questions, in answer order.
    #[must_use]
    pub fn answered_ids(&self) -> Vec<QuestionId> {
        self.records.iter().map(|record| record.question_id).collect()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            State::Complete { completed_at } => Some(completed_at),
            _ => None,
        }
    }

    /// Index of the question currently shown, if any.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.state.index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.state.index().map(|index| &self.questions[index])
    }

    /// Time since the session started; frozen once it completes.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.state) {
            (Some(started), State::Complete { completed_at }) => completed_at - started,
            (Some(started), _) => self.clock.elapsed_since(started),
            (None, _) => Duration::zero(),
        }
    }

    /// Time left on the current question when a limit is set and a question is active.
    #[must_use]
    pub fn time_remaining(&self) -> Option<Duration> {
        let limit = self.time_limit?;
        let State::Active { shown_at, .. } = self.state else {
            return None;
        };
        let left = limit - self.clock.elapsed_since(shown_at);
        Some(left.max(Duration::zero()))
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.records.len(),
            remaining: self.questions.len().saturating_sub(self.records.len()),
            score: self.score,
            is_complete: self.is_complete(),
        }
    }

    /// Reset and begin a session over `questions`.
    ///
    /// Questions repeating an earlier id are dropped. Returns the number of
    /// questions in the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` if `questions` is empty; the
    /// session is left exactly as it was.
    pub fn start_session(&mut self, questions: Vec<Question>) -> Result<usize, SessionError> {
        let now = self.clock.now();
        self.start_session_at(questions, now)
    }

    /// `start_session` with an explicit start time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` if `questions` is empty.
    pub fn start_session_at(
        &mut self,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<usize, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::InvalidInput);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        let questions: Vec<Question> = questions
            .into_iter()
            .filter(|question| seen.insert(question.id()))
            .collect();

        self.questions = questions;
        self.score = 0;
        self.records.clear();
        self.started_at = Some(now);
        self.state = State::Active {
            index: 0,
            shown_at: now,
        };

        tracing::debug!(total = self.questions.len(), "quiz session started");
        Ok(self.questions.len())
    }

    /// Answer the current question with `choice_index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Active`.
    /// Returns `SessionError::ChoiceOutOfRange` if the index has no choice.
    pub fn submit_answer(&mut self, choice_index: usize) -> Result<AnswerOutcome, SessionError> {
        let now = self.clock.now();
        self.submit_answer_at(choice_index, now)
    }

    /// `submit_answer` evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::submit_answer`].
    pub fn submit_answer_at(
        &mut self,
        choice_index: usize,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionError> {
        let State::Active { index, shown_at } = self.state else {
            return Err(self.invalid_phase("submit_answer"));
        };

        let question = &self.questions[index];
        let len = question.choices().len();
        if choice_index >= len {
            return Err(SessionError::ChoiceOutOfRange {
                choice: choice_index,
                len,
            });
        }

        let verdict = if self.is_overdue(shown_at, now) {
            AnswerVerdict::TimedOut
        } else if question.is_correct(choice_index) {
            AnswerVerdict::Correct
        } else {
            AnswerVerdict::Incorrect
        };

        Ok(self.record(index, Some(choice_index), verdict, now))
    }

    /// Resolve the current question as timed out, e.g. when a UI timer fires.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Active`.
    pub fn expire_current(&mut self) -> Result<AnswerOutcome, SessionError> {
        let now = self.clock.now();
        self.expire_current_at(now)
    }

    /// `expire_current` evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Active`.
    pub fn expire_current_at(&mut self, now: DateTime<Utc>) -> Result<AnswerOutcome, SessionError> {
        let State::Active { index, .. } = self.state else {
            return Err(self.invalid_phase("expire_current"));
        };
        Ok(self.record(index, None, AnswerVerdict::TimedOut, now))
    }

    /// Move past an answered question.
    ///
    /// Returns the new phase: `Active` on the next question, or `Complete`
    /// when none remain.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Answered`.
    pub fn next(&mut self) -> Result<SessionPhase, SessionError> {
        let now = self.clock.now();
        self.next_at(now)
    }

    /// `next` evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Answered`.
    pub fn next_at(&mut self, now: DateTime<Utc>) -> Result<SessionPhase, SessionError> {
        let State::Answered { index } = self.state else {
            return Err(self.invalid_phase("next"));
        };

        let next = index + 1;
        self.state = if next < self.questions.len() {
            State::Active {
                index: next,
                shown_at: now,
            }
        } else {
            tracing::debug!(score = self.score, total = self.questions.len(), "quiz session complete");
            // Never before the start, so the summary's time range stays valid.
            let completed_at = self.started_at.map_or(now, |started| now.max(started));
            State::Complete { completed_at }
        };
        Ok(self.phase())
    }

    /// Summary of a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless the session is `Complete`.
    pub fn summary(&self) -> Result<QuizSummary, SessionError> {
        let (Some(started_at), State::Complete { completed_at }) = (self.started_at, self.state)
        else {
            return Err(self.invalid_phase("summary"));
        };
        Ok(QuizSummary::from_records(
            started_at,
            completed_at,
            &self.records,
        )?)
    }

    fn is_overdue(&self, shown_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.time_limit.is_some_and(|limit| now - shown_at > limit)
    }

    fn record(
        &mut self,
        index: usize,
        choice: Option<usize>,
        verdict: AnswerVerdict,
        now: DateTime<Utc>,
    ) -> AnswerOutcome {
        let question = &self.questions[index];
        let question_id = question.id();
        let correct_index = question.correct_index();

        if verdict.is_correct() {
            self.score += 1;
        }
        self.records
            .push(AnswerRecord::new(question_id, choice, verdict, now));
        self.state = State::Answered { index };

        tracing::debug!(%question_id, ?verdict, score = self.score, "answer recorded");
        AnswerOutcome {
            question_id,
            choice,
            verdict,
            correct_index,
            score: self.score,
            is_last: index + 1 == self.questions.len(),
        }
    }

    fn invalid_phase(&self, operation: &'static str) -> SessionError {
        let phase = self.phase();
        tracing::debug!(operation, %phase, "rejected session operation");
        SessionError::InvalidPhase { operation, phase }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("phase", &self.phase())
            .field("questions_len", &self.questions.len())
            .field("current", &self.current_index())
            .field("score", &self.score)
            .field("records_len", &self.records.len())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use quiz_core::model::{Difficulty, QuestionDraft, QuestionKind};
    use quiz_core::time::{fixed_clock, fixed_now};

    fn build_question(n: u64, correct_index: usize) -> Question {
        QuestionDraft {
            id: Some(QuestionId::new(n)),
            prompt: format!("Question {n}?"),
            choices: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_index,
            difficulty: Difficulty::Easy,
            category: None,
            kind: QuestionKind::MultipleChoice,
        }
        .validate()
        .unwrap()
    }

    fn questions(n: u64) -> Vec<Question> {
        (1..=n).map(|i| build_question(i, 0)).collect()
    }

    #[test]
    fn new_session_is_idle() {
        let session = QuizSession::new(fixed_clock());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.current_question().is_none());
        assert_eq!(session.elapsed(), Duration::zero());
    }

    #[test]
    fn empty_start_fails_and_stays_idle() {
        let mut session = QuizSession::new(fixed_clock());
        let err = session.start_session(Vec::new()).unwrap_err();
        assert_eq!(err, SessionError::InvalidInput);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.started_at().is_none());
    }

    #[test]
    fn empty_restart_keeps_running_session() {
        let mut session = QuizSession::new(fixed_clock());
        session.start_session(questions(2)).unwrap();
        session.submit_answer(0).unwrap();

        assert!(session.start_session(Vec::new()).is_err());
        assert_eq!(session.phase(), SessionPhase::Answered);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn full_run_completes_with_bounded_score() {
        let mut session = QuizSession::new(fixed_clock());
        let total = session.start_session(questions(4)).unwrap();
        assert_eq!(total, 4);

        for (i, choice) in [0, 1, 0, 2].into_iter().enumerate() {
            assert_eq!(session.phase(), SessionPhase::Active);
            assert_eq!(session.current_index(), Some(i));
            let outcome = session.submit_answer(choice).unwrap();
            assert_eq!(outcome.is_last, i == 3);
            session.next().unwrap();
        }

        assert_eq!(session.phase(), SessionPhase::Complete);
        assert_eq!(session.score(), 2);
        assert!(session.current_question().is_none());
        assert_eq!(session.progress().remaining, 0);
    }

    #[test]
    fn double_submit_does_not_double_count() {
        let mut session = QuizSession::new(fixed_clock());
        session.start_session(questions(2)).unwrap();

        session.submit_answer(0).unwrap();
        let err = session.submit_answer(0).unwrap_err();

        assert_eq!(
            err,
            SessionError::InvalidPhase {
                operation: "submit_answer",
                phase: SessionPhase::Answered
            }
        );
        assert_eq!(session.score(), 1);
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn next_requires_answered_phase() {
        let mut session = QuizSession::new(fixed_clock());
        assert!(matches!(
            session.next(),
            Err(SessionError::InvalidPhase {
                phase: SessionPhase::Idle,
                ..
            })
        ));

        session.start_session(questions(1)).unwrap();
        assert!(session.next().is_err());
        assert_eq!(session.phase(), SessionPhase::Active);

        session.submit_answer(3).unwrap();
        assert_eq!(session.next().unwrap(), SessionPhase::Complete);
        assert!(session.next().is_err());
        assert!(session.submit_answer(0).is_err());
    }

    #[test]
    fn out_of_range_choice_is_rejected_without_state_change() {
        let mut session = QuizSession::new(fixed_clock());
        session.start_session(questions(1)).unwrap();

        let err = session.submit_answer(4).unwrap_err();
        assert_eq!(err, SessionError::ChoiceOutOfRange { choice: 4, len: 4 });
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(session.records().is_empty());
    }

    #[test]
    fn duplicate_questions_are_dropped_on_start() {
        let mut session = QuizSession::new(fixed_clock());
        let mut list = questions(3);
        list.push(build_question(2, 1));

        assert_eq!(session.start_session(list).unwrap(), 3);
        assert_eq!(session.questions().len(), 3);
    }

    #[test]
    fn restart_resets_score_and_pointer() {
        let mut session = QuizSession::new(fixed_clock());
        session.start_session(questions(2)).unwrap();
        session.submit_answer(0).unwrap();
        session.next().unwrap();

        session.start_session(questions(3)).unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.score(), 0);
        assert!(session.answered_ids().is_empty());
    }

    #[test]
    fn late_answer_counts_as_timed_out() {
        let mut session = QuizSession::new(fixed_clock()).with_time_limit(Duration::seconds(20));
        let start = fixed_now();
        session.start_session_at(questions(2), start).unwrap();

        let on_time = session
            .submit_answer_at(0, start + Duration::seconds(20))
            .unwrap();
        assert_eq!(on_time.verdict, AnswerVerdict::Correct);
        session.next_at(start + Duration::seconds(21)).unwrap();

        let late = session
            .submit_answer_at(0, start + Duration::seconds(45))
            .unwrap();
        assert_eq!(late.verdict, AnswerVerdict::TimedOut);
        assert_eq!(late.score, 1);
    }

    #[test]
    fn expire_records_timeout_without_choice() {
        let mut session = QuizSession::new(fixed_clock());
        session.start_session(questions(1)).unwrap();

        let outcome = session.expire_current().unwrap();
        assert_eq!(outcome.choice, None);
        assert_eq!(outcome.verdict, AnswerVerdict::TimedOut);
        assert!(session.expire_current().is_err());

        session.next().unwrap();
        let summary = session.summary().unwrap();
        assert_eq!(summary.timed_out(), 1);
        assert_eq!(summary.correct(), 0);
    }

    #[test]
    fn time_remaining_tracks_active_question() {
        let session_clock = Clock::fixed(fixed_now() + Duration::seconds(5));
        let mut session = QuizSession::new(session_clock).with_time_limit(Duration::seconds(20));
        session.start_session_at(questions(1), fixed_now()).unwrap();

        assert_eq!(session.time_remaining(), Some(Duration::seconds(15)));
        assert_eq!(session.elapsed(), Duration::seconds(5));

        session.submit_answer(0).unwrap();
        assert_eq!(session.time_remaining(), None);
    }

    #[test]
    fn completion_before_start_time_is_clamped() {
        let started = fixed_now() + Duration::seconds(10);
        let mut session = QuizSession::new(fixed_clock());
        session.start_session_at(questions(1), started).unwrap();
        session.submit_answer(0).unwrap();

        assert_eq!(session.next().unwrap(), SessionPhase::Complete);
        assert_eq!(session.completed_at(), Some(started));
        let summary = session.summary().unwrap();
        assert_eq!(summary.duration(), Duration::zero());
        assert_eq!(summary.correct(), 1);
    }

    #[test]
    fn any_length_run_completes_with_bounded_score() {
        let mut rng = StdRng::seed_from_u64(11);
        for n in 1..=10u64 {
            let mut session = QuizSession::new(fixed_clock());
            session.start_session(questions(n)).unwrap();

            let mut expected = 0;
            while let Some(question) = session.current_question() {
                let choice = rng.random_range(0..question.choices().len());
                if question.is_correct(choice) {
                    expected += 1;
                }
                session.submit_answer(choice).unwrap();
                session.next().unwrap();
            }

            assert_eq!(session.phase(), SessionPhase::Complete);
            assert_eq!(session.score(), expected);
            assert!(u64::from(session.score()) <= n);
            assert_eq!(session.records().len(), n as usize);
            assert!(session.summary().is_ok());
        }
    }

    #[test]
    fn summary_requires_completion() {
        let mut session = QuizSession::new(fixed_clock());
        assert!(session.summary().is_err());
        session.start_session(questions(1)).unwrap();
        assert!(session.summary().is_err());
    }
}
