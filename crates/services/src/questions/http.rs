use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;

use quiz_core::model::{Difficulty, Question, QuestionDraft, QuestionKind, QuizConfig};

use super::entities::decode_html_entities;
use crate::error::FetchError;

/// Largest `amount` the trivia API accepts per request.
pub const MAX_AMOUNT: usize = 50;

pub const API_CODE_SUCCESS: u8 = 0;
pub const API_CODE_NO_RESULTS: u8 = 1;
pub const API_CODE_INVALID_PARAMETER: u8 = 2;
pub const API_CODE_TOKEN_NOT_FOUND: u8 = 3;
pub const API_CODE_TOKEN_EMPTY: u8 = 4;
pub const API_CODE_RATE_LIMIT: u8 = 5;

/// Parameters for a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub amount: usize,
    pub difficulty: Option<Difficulty>,
}

/// Network seam for question loading.
#[async_trait]
pub trait QuestionFetcher: Send + Sync {
    /// Perform one fetch attempt.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` for transport, status, API-code or empty-body failures.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, FetchError>;
}

/// `QuestionFetcher` backed by the trivia HTTP API.
#[derive(Clone)]
pub struct HttpQuestionFetcher {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpQuestionFetcher {
    #[must_use]
    pub fn new(config: &QuizConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to build HTTP client, using defaults");
                Client::new()
            });
        let api_key = config
            .has_usable_api_key()
            .then(|| config.api_key().map(str::to_string))
            .flatten();
        Self {
            client,
            base_url: config.api_base_url().to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl QuestionFetcher for HttpQuestionFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, FetchError> {
        let mut query = vec![("amount", request.amount.min(MAX_AMOUNT).to_string())];
        if let Some(difficulty) = request.difficulty {
            query.push(("difficulty", difficulty.as_str().to_string()));
        }

        let mut builder = self.client.get(&self.base_url).query(&query);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status()));
        }

        let body: ApiResponse = response.json().await?;
        let mut rng = rand::rng();
        normalize_response(body, &mut rng)
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    response_code: u8,
    #[serde(default)]
    results: Vec<ApiQuestion>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiQuestion {
    #[serde(rename = "type")]
    kind: String,
    difficulty: String,
    #[serde(default)]
    category: Option<String>,
    question: String,
    correct_answer: String,
    #[serde(default)]
    incorrect_answers: Vec<String>,
}

fn api_code_message(code: u8) -> &'static str {
    match code {
        API_CODE_NO_RESULTS => "not enough questions for the query",
        API_CODE_INVALID_PARAMETER => "invalid parameter",
        API_CODE_TOKEN_NOT_FOUND => "session token not found",
        API_CODE_TOKEN_EMPTY => "session token exhausted",
        API_CODE_RATE_LIMIT => "rate limit exceeded",
        _ => "unknown response code",
    }
}

/// Map an API body to validated questions, skipping entries that fail validation.
pub(crate) fn normalize_response<R: Rng>(
    body: ApiResponse,
    rng: &mut R,
) -> Result<Vec<Question>, FetchError> {
    if body.response_code != API_CODE_SUCCESS {
        return Err(FetchError::Api {
            code: body.response_code,
            message: api_code_message(body.response_code),
        });
    }

    let questions: Vec<Question> = body
        .results
        .into_iter()
        .filter_map(|raw| {
            let draft = to_draft(raw, &mut *rng)?;
            match draft.validate() {
                Ok(question) => Some(question),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping invalid question from trivia API");
                    None
                }
            }
        })
        .collect();

    if questions.is_empty() {
        return Err(FetchError::EmptyResponse);
    }
    Ok(questions)
}

fn to_draft<R: Rng>(raw: ApiQuestion, rng: &mut R) -> Option<QuestionDraft> {
    let difficulty = match raw.difficulty.parse::<Difficulty>() {
        Ok(difficulty) => difficulty,
        Err(err) => {
            tracing::warn!(error = %err, "skipping question with unknown difficulty");
            return None;
        }
    };
    let kind = match raw.kind.parse::<QuestionKind>() {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(error = %err, "skipping question with unknown type");
            return None;
        }
    };

    let correct = decode_html_entities(&raw.correct_answer);
    let (choices, correct_index) = match kind {
        QuestionKind::TrueFalse => {
            let is_true = correct.trim().eq_ignore_ascii_case("true");
            (
                vec!["True".to_string(), "False".to_string()],
                if is_true { 0 } else { 1 },
            )
        }
        QuestionKind::MultipleChoice => {
            let mut choices: Vec<String> = raw
                .incorrect_answers
                .iter()
                .map(|answer| decode_html_entities(answer))
                .collect();
            let correct_index = rng.random_range(0..=choices.len());
            choices.insert(correct_index, correct);
            (choices, correct_index)
        }
    };

    Some(QuestionDraft {
        id: None,
        prompt: decode_html_entities(&raw.question),
        choices,
        correct_index,
        difficulty,
        category: raw.category.as_deref().map(decode_html_entities),
        kind,
    })
}
