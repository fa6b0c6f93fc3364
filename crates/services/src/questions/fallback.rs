use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use quiz_core::model::{Difficulty, Question, QuestionDraft, QuestionKind};

const BUNDLED_JSON: &str = include_str!("../../data/fallback_questions.json");

#[derive(Debug, Deserialize)]
struct FallbackEntry {
    prompt: String,
    choices: Vec<String>,
    correct_index: usize,
    difficulty: Difficulty,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    kind: QuestionKind,
}

/// Static question set served when the live API is unavailable or unconfigured.
#[derive(Debug, Clone, Default)]
pub struct FallbackQuestions {
    questions: Vec<Question>,
}

impl FallbackQuestions {
    /// The question set compiled into the binary.
    ///
    /// Entries that fail validation are skipped; a malformed file yields an
    /// empty set. Both cases are logged, never returned.
    #[must_use]
    pub fn bundled() -> Self {
        let entries: Vec<FallbackEntry> = match serde_json::from_str(BUNDLED_JSON) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(error = %err, "bundled fallback questions are malformed");
                return Self::default();
            }
        };

        let questions = entries
            .into_iter()
            .filter_map(|entry| {
                QuestionDraft {
                    id: None,
                    prompt: entry.prompt,
                    choices: entry.choices,
                    correct_index: entry.correct_index,
                    difficulty: entry.difficulty,
                    category: entry.category,
                    kind: entry.kind,
                }
                .validate()
                .map_err(|err| tracing::warn!(error = %err, "skipping invalid fallback question"))
                .ok()
            })
            .collect();

        Self { questions }
    }

    #[must_use]
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions available at `difficulty` (`None` = any).
    #[must_use]
    pub fn available(&self, difficulty: Option<Difficulty>) -> usize {
        self.matching(difficulty).count()
    }

    /// Pick up to `count` shuffled questions at `difficulty` (`None` = any).
    ///
    /// Returns every match when fewer than `count` exist.
    #[must_use]
    pub fn select<R: Rng>(
        &self,
        count: usize,
        difficulty: Option<Difficulty>,
        rng: &mut R,
    ) -> Vec<Question> {
        let mut picked: Vec<Question> = self.matching(difficulty).cloned().collect();
        picked.shuffle(rng);
        picked.truncate(count);
        picked
    }

    fn matching(&self, difficulty: Option<Difficulty>) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(move |question| difficulty.is_none_or(|d| question.difficulty() == d))
    }
}
