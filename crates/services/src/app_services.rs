use std::sync::Arc;

use chrono::Duration;
use quiz_core::model::QuizConfig;

use crate::Clock;
use crate::questions::{QuestionFetcher, QuestionSource};
use crate::sessions::QuizLoopService;

/// Assembles app-facing services from a resolved configuration.
#[derive(Clone)]
pub struct AppServices {
    config: QuizConfig,
    questions: Arc<QuestionSource>,
    quiz_loop: Arc<QuizLoopService>,
}

impl AppServices {
    /// Build services that talk to the configured trivia API.
    #[must_use]
    pub fn from_config(config: QuizConfig, clock: Clock) -> Self {
        let questions = Arc::new(QuestionSource::from_config(config.clone()));
        Self::assemble(config, clock, questions)
    }

    /// Build services around a caller-supplied fetcher.
    #[must_use]
    pub fn with_fetcher(
        config: QuizConfig,
        clock: Clock,
        fetcher: Arc<dyn QuestionFetcher>,
    ) -> Self {
        let questions = Arc::new(QuestionSource::new(config.clone(), fetcher));
        Self::assemble(config, clock, questions)
    }

    /// Apply a per-question time limit to every session started from here on.
    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        let quiz_loop = (*self.quiz_loop).clone().with_time_limit(time_limit);
        self.quiz_loop = Arc::new(quiz_loop);
        self
    }

    fn assemble(config: QuizConfig, clock: Clock, questions: Arc<QuestionSource>) -> Self {
        tracing::debug!(
            environment = %config.environment(),
            mode = ?config.question_mode(),
            "assembling app services"
        );
        let quiz_loop = Arc::new(QuizLoopService::new(clock, Arc::clone(&questions)));
        Self {
            config,
            questions,
            quiz_loop,
        }
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn questions(&self) -> Arc<QuestionSource> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }
}
