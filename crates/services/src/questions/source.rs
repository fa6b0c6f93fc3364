use std::fmt;
use std::sync::Arc;

use quiz_core::model::{Difficulty, Question, QuestionMode, QuizConfig};

use super::cancel::CancelToken;
use super::fallback::FallbackQuestions;
use super::http::{FetchRequest, HttpQuestionFetcher, MAX_AMOUNT, QuestionFetcher};
use crate::error::FetchError;

/// Why live loading was skipped or abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The configuration selects bundled questions (offline flag or no usable key).
    Offline,
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last_error: String },
    /// A failure that another attempt would not fix.
    NotRetryable { error: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str("offline mode"),
            Self::Exhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} attempts: {last_error}"),
            Self::NotRetryable { error } => write!(f, "live questions unavailable: {error}"),
        }
    }
}

/// Where a loaded question list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOrigin {
    Live,
    Fallback { reason: FallbackReason },
    /// The load was cancelled; the list is empty.
    Cancelled,
    /// Zero questions were requested; the list is empty.
    NotRequested,
}

impl QuestionOrigin {
    /// Short user-facing notice when questions did not come from the live API.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Fallback { reason } => Some(format!("Playing with offline questions ({reason}).")),
            Self::Live | Self::Cancelled | Self::NotRequested => None,
        }
    }
}

/// Outcome of `QuestionSource::load_questions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedQuestions {
    pub questions: Vec<Question>,
    pub origin: QuestionOrigin,
}

impl LoadedQuestions {
    fn empty(origin: QuestionOrigin) -> Self {
        Self {
            questions: Vec::new(),
            origin,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, QuestionOrigin::Fallback { .. })
    }

    #[must_use]
    pub fn notice(&self) -> Option<String> {
        self.origin.notice()
    }
}

/// Question source adapter: live API with bounded retries, falling back to bundled data.
#[derive(Clone)]
pub struct QuestionSource {
    config: QuizConfig,
    fetcher: Arc<dyn QuestionFetcher>,
    fallback: Arc<FallbackQuestions>,
}

impl QuestionSource {
    #[must_use]
    pub fn new(config: QuizConfig, fetcher: Arc<dyn QuestionFetcher>) -> Self {
        Self {
            config,
            fetcher,
            fallback: Arc::new(FallbackQuestions::bundled()),
        }
    }

    /// Source wired to the trivia HTTP API described by `config`.
    #[must_use]
    pub fn from_config(config: QuizConfig) -> Self {
        let fetcher = Arc::new(HttpQuestionFetcher::new(&config));
        Self::new(config, fetcher)
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackQuestions) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Load up to `count` questions at `difficulty` (`None` = any).
    ///
    /// Never fails. Live questions are tried first when the configuration
    /// allows it; any failure substitutes bundled questions. A cancelled load
    /// returns an empty list with `QuestionOrigin::Cancelled`.
    pub async fn load_questions(
        &self,
        count: usize,
        difficulty: Option<Difficulty>,
        cancel: &CancelToken,
    ) -> LoadedQuestions {
        if count == 0 {
            return LoadedQuestions::empty(QuestionOrigin::NotRequested);
        }
        if cancel.is_cancelled() {
            return LoadedQuestions::empty(QuestionOrigin::Cancelled);
        }
        let count = if count > MAX_AMOUNT {
            tracing::debug!(requested = count, max = MAX_AMOUNT, "clamping question count");
            MAX_AMOUNT
        } else {
            count
        };

        if self.config.question_mode() == QuestionMode::Fallback {
            return self.fallback(count, difficulty, FallbackReason::Offline);
        }

        let request = FetchRequest {
            amount: count,
            difficulty,
        };
        let max_attempts = self.config.max_attempts();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return self.cancelled(),
                outcome = self.attempt(&request) => outcome,
            };

            match outcome {
                Ok(mut questions) => {
                    questions.truncate(count);
                    tracing::info!(
                        attempt,
                        loaded = questions.len(),
                        requested = count,
                        "loaded live questions"
                    );
                    return LoadedQuestions {
                        questions,
                        origin: QuestionOrigin::Live,
                    };
                }
                Err(err) if !err.is_retryable() => {
                    tracing::warn!(attempt, error = %err, "question fetch failed, not retrying");
                    let reason = FallbackReason::NotRetryable {
                        error: err.to_string(),
                    };
                    return self.fallback(count, difficulty, reason);
                }
                Err(err) => {
                    tracing::warn!(attempt, max_attempts, error = %err, "question fetch failed");
                    last_error = Some(err);
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    () = cancel.cancelled() => return self.cancelled(),
                    () = tokio::time::sleep(self.config.retry_delay()) => {}
                }
            }
        }

        let reason = FallbackReason::Exhausted {
            attempts: max_attempts,
            last_error: last_error.map_or_else(|| "unknown error".to_string(), |e| e.to_string()),
        };
        self.fallback(count, difficulty, reason)
    }

    async fn attempt(&self, request: &FetchRequest) -> Result<Vec<Question>, FetchError> {
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, self.fetcher.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }

    fn fallback(
        &self,
        count: usize,
        difficulty: Option<Difficulty>,
        reason: FallbackReason,
    ) -> LoadedQuestions {
        let questions = self.fallback.select(count, difficulty, &mut rand::rng());
        if questions.len() < count {
            tracing::warn!(
                requested = count,
                available = questions.len(),
                ?difficulty,
                "fallback set is smaller than requested"
            );
        }
        tracing::info!(%reason, loaded = questions.len(), "serving fallback questions");
        LoadedQuestions {
            questions,
            origin: QuestionOrigin::Fallback { reason },
        }
    }

    fn cancelled(&self) -> LoadedQuestions {
        tracing::debug!("question load cancelled");
        LoadedQuestions::empty(QuestionOrigin::Cancelled)
    }
}

impl fmt::Debug for QuestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionSource")
            .field("config", &self.config)
            .field("fallback_len", &self.fallback.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use quiz_core::model::{FeatureFlags, QuestionDraft, QuestionKind, QuizConfigDraft};

    use super::*;

    fn live_config(max_attempts: u32) -> QuizConfig {
        QuizConfigDraft {
            api_key: Some("live-key-123".into()),
            max_attempts: Some(max_attempts),
            retry_delay_ms: Some(0),
            request_timeout_ms: Some(100),
            ..QuizConfigDraft::default()
        }
        .validate()
        .unwrap()
    }

    fn live_question(n: usize, difficulty: Difficulty) -> Question {
        QuestionDraft {
            id: None,
            prompt: format!("Live question {n}?"),
            choices: vec!["Yes".into(), "No".into()],
            correct_index: 0,
            difficulty,
            category: None,
            kind: QuestionKind::MultipleChoice,
        }
        .validate()
        .unwrap()
    }

    #[derive(Clone, Copy)]
    enum Step {
        Questions(usize),
        Status(reqwest::StatusCode),
    }

    /// Replays scripted results, then repeats the last one.
    struct ScriptedFetcher {
        calls: AtomicU32,
        script: Mutex<Vec<Step>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(script),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuestionFetcher for ScriptedFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0]
                }
            };
            let difficulty = request.difficulty.unwrap_or(Difficulty::Medium);
            match step {
                Step::Questions(n) => Ok((0..n).map(|i| live_question(i, difficulty)).collect()),
                Step::Status(status) => Err(FetchError::HttpStatus(status)),
            }
        }
    }

    struct HangingFetcher;

    #[async_trait]
    impl QuestionFetcher for HangingFetcher {
        async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Question>, FetchError> {
            std::future::pending().await
        }
    }

    const UNAVAILABLE: Step = Step::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE);
    const NOT_FOUND: Step = Step::Status(reqwest::StatusCode::NOT_FOUND);

    #[tokio::test]
    async fn live_success_returns_live_questions() {
        let fetcher = ScriptedFetcher::new(vec![Step::Questions(8)]);
        let source = QuestionSource::new(live_config(3), fetcher.clone());

        let loaded = source
            .load_questions(5, Some(Difficulty::Easy), &CancelToken::new())
            .await;

        assert_eq!(loaded.origin, QuestionOrigin::Live);
        assert_eq!(loaded.questions.len(), 5);
        assert_eq!(fetcher.calls(), 1);
        assert!(loaded.notice().is_none());
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let fetcher = ScriptedFetcher::new(vec![UNAVAILABLE, UNAVAILABLE, Step::Questions(3)]);
        let source = QuestionSource::new(live_config(3), fetcher.clone());

        let loaded = source.load_questions(3, None, &CancelToken::new()).await;

        assert_eq!(loaded.origin, QuestionOrigin::Live);
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn network_failure_falls_back_to_requested_difficulty() {
        let fetcher = ScriptedFetcher::new(vec![UNAVAILABLE]);
        let source = QuestionSource::new(live_config(3), fetcher.clone());

        let loaded = source
            .load_questions(5, Some(Difficulty::Hard), &CancelToken::new())
            .await;

        assert_eq!(fetcher.calls(), 3);
        assert!(matches!(
            loaded.origin,
            QuestionOrigin::Fallback {
                reason: FallbackReason::Exhausted { attempts: 3, .. }
            }
        ));
        assert_eq!(loaded.questions.len(), 5);
        assert!(
            loaded
                .questions
                .iter()
                .all(|q| q.difficulty() == Difficulty::Hard)
        );
        assert!(loaded.notice().is_some());
    }

    #[tokio::test]
    async fn non_retryable_failure_skips_remaining_attempts() {
        let fetcher = ScriptedFetcher::new(vec![NOT_FOUND]);
        let source = QuestionSource::new(live_config(5), fetcher.clone());

        let loaded = source.load_questions(4, None, &CancelToken::new()).await;

        assert_eq!(fetcher.calls(), 1);
        assert!(matches!(
            loaded.origin,
            QuestionOrigin::Fallback {
                reason: FallbackReason::NotRetryable { .. }
            }
        ));
        assert_eq!(loaded.questions.len(), 4);
    }

    #[tokio::test]
    async fn offline_config_never_touches_network() {
        let fetcher = ScriptedFetcher::new(vec![Step::Questions(5)]);
        let config = QuizConfigDraft {
            api_key: Some("live-key-123".into()),
            features: FeatureFlags {
                offline: true,
                ..FeatureFlags::default()
            },
            ..QuizConfigDraft::default()
        }
        .validate()
        .unwrap();
        let source = QuestionSource::new(config, fetcher.clone());

        let loaded = source
            .load_questions(3, Some(Difficulty::Easy), &CancelToken::new())
            .await;

        assert_eq!(fetcher.calls(), 0);
        assert_eq!(
            loaded.origin,
            QuestionOrigin::Fallback {
                reason: FallbackReason::Offline
            }
        );
        assert_eq!(loaded.questions.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_fetch_times_out_and_falls_back() {
        let source = QuestionSource::new(live_config(2), Arc::new(HangingFetcher));

        let loaded = source.load_questions(2, None, &CancelToken::new()).await;

        match loaded.origin {
            QuestionOrigin::Fallback {
                reason: FallbackReason::Exhausted { attempts, last_error },
            } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("timed out"), "{last_error}");
            }
            other => panic!("unexpected origin {other:?}"),
        }
        assert_eq!(loaded.questions.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_returns_empty_list() {
        let source = QuestionSource::new(live_config(3), Arc::new(HangingFetcher));
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let loaded = source.load_questions(3, None, &cancel).await;

        assert_eq!(loaded.origin, QuestionOrigin::Cancelled);
        assert!(loaded.questions.is_empty());
    }

    #[tokio::test]
    async fn zero_count_and_precancelled_are_empty() {
        let fetcher = ScriptedFetcher::new(vec![Step::Questions(5)]);
        let source = QuestionSource::new(live_config(3), fetcher.clone());

        let none = source.load_questions(0, None, &CancelToken::new()).await;
        assert_eq!(none.origin, QuestionOrigin::NotRequested);
        assert!(none.questions.is_empty());

        let cancel = CancelToken::new();
        cancel.cancel();
        let cancelled = source.load_questions(3, None, &cancel).await;
        assert_eq!(cancelled.origin, QuestionOrigin::Cancelled);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn fallback_returns_best_effort_subset() {
        let fetcher = ScriptedFetcher::new(vec![UNAVAILABLE]);
        let small = FallbackQuestions::from_questions(vec![
            live_question(1, Difficulty::Easy),
            live_question(2, Difficulty::Easy),
        ]);
        let source = QuestionSource::new(live_config(1), fetcher).with_fallback(small);

        let loaded = source
            .load_questions(10, Some(Difficulty::Easy), &CancelToken::new())
            .await;

        assert!(loaded.is_fallback());
        assert_eq!(loaded.questions.len(), 2);
    }
}
