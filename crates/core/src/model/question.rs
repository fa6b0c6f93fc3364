use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least 2 choices, got {0}")]
    TooFewChoices(usize),

    #[error("choice {index} is empty")]
    EmptyChoice { index: usize },

    #[error("choice {index} duplicates an earlier choice")]
    DuplicateChoice { index: usize },

    #[error("correct index {index} is out of range for {len} choices")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("true/false questions need exactly 2 choices, got {0}")]
    InvalidTrueFalse(usize),
}

/// Error returned when a difficulty or kind label is not recognized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {raw}")]
pub struct ParseLabelError {
    kind: &'static str,
    raw: String,
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tag carried by every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Lowercase label used by the trivia API and the CLI.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseLabelError {
                kind: "difficulty",
                raw: s.to_string(),
            }),
        }
    }
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Shape of the answer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestionKind {
    #[default]
    #[serde(rename = "multiple")]
    MultipleChoice,
    #[serde(rename = "boolean")]
    TrueFalse,
}

impl FromStr for QuestionKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multiple" => Ok(Self::MultipleChoice),
            "boolean" => Ok(Self::TrueFalse),
            _ => Err(ParseLabelError {
                kind: "question type",
                raw: s.to_string(),
            }),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question fields, as produced by a question source.
#[derive(Debug, Clone)]
pub struct QuestionDraft {
    pub id: Option<QuestionId>,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    pub difficulty: Difficulty,
    pub category: Option<String>,
    pub kind: QuestionKind,
}

impl QuestionDraft {
    /// Validate and normalize the draft into a read-only question.
    ///
    /// Text fields are trimmed. When no id is given, one is derived from the
    /// prompt with [`QuestionId::from_text`].
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or any choice is empty, choices
    /// repeat, there are fewer than two choices, or the correct index does not
    /// point at a choice.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let choices: Vec<String> = self
            .choices
            .into_iter()
            .map(|choice| choice.trim().to_string())
            .collect();
        if choices.len() < 2 {
            return Err(QuestionError::TooFewChoices(choices.len()));
        }
        if self.kind == QuestionKind::TrueFalse && choices.len() != 2 {
            return Err(QuestionError::InvalidTrueFalse(choices.len()));
        }

        let mut seen = HashSet::with_capacity(choices.len());
        for (index, choice) in choices.iter().enumerate() {
            if choice.is_empty() {
                return Err(QuestionError::EmptyChoice { index });
            }
            if !seen.insert(choice.to_lowercase()) {
                return Err(QuestionError::DuplicateChoice { index });
            }
        }

        if self.correct_index >= choices.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: self.correct_index,
                len: choices.len(),
            });
        }

        let category = self
            .category
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty());
        let id = self.id.unwrap_or_else(|| QuestionId::from_text(&prompt));

        Ok(Question {
            id,
            prompt,
            choices,
            correct_index: self.correct_index,
            difficulty: self.difficulty,
            category,
            kind: self.kind,
        })
    }
}

/// A single quiz question with its choices and correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    choices: Vec<String>,
    correct_index: usize,
    difficulty: Difficulty,
    category: Option<String>,
    kind: QuestionKind,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// The text of the correct choice.
    #[must_use]
    pub fn correct_choice(&self) -> &str {
        &self.choices[self.correct_index]
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn is_correct(&self, choice_index: usize) -> bool {
        choice_index == self.correct_index
    }
}
