use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://opentdb.com/api.php";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

const REQUEST_TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=60_000;
const MAX_ATTEMPTS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
const RETRY_DELAY_RANGE_MS: std::ops::RangeInclusive<u64> = 0..=10_000;

const PLACEHOLDER_KEYS: &[&str] = &[
    "changeme",
    "change-me",
    "placeholder",
    "your_api_key",
    "your-api-key",
    "your_api_key_here",
    "api_key_here",
    "todo",
    "none",
    "null",
];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Configuration field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    ApiBaseUrl,
    RequestTimeout,
    MaxAttempts,
    RetryDelay,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizConfigError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("request timeout must be between 100 and 60000 ms, got {0}")]
    InvalidRequestTimeout(u64),

    #[error("max attempts must be between 1 and 10, got {0}")]
    InvalidMaxAttempts(u32),

    #[error("retry delay must be at most 10000 ms, got {0}")]
    InvalidRetryDelay(u64),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
}

impl QuizConfigError {
    /// The draft field responsible for this error, if any.
    #[must_use]
    pub fn field(&self) -> Option<ConfigField> {
        match self {
            Self::InvalidBaseUrl(_) => Some(ConfigField::ApiBaseUrl),
            Self::InvalidRequestTimeout(_) => Some(ConfigField::RequestTimeout),
            Self::InvalidMaxAttempts(_) => Some(ConfigField::MaxAttempts),
            Self::InvalidRetryDelay(_) => Some(ConfigField::RetryDelay),
            Self::UnknownEnvironment(_) => None,
        }
    }
}

//
// ─── ENVIRONMENT / FLAGS ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeEnv {
    #[default]
    Development,
    Production,
}

impl RuntimeEnv {
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for RuntimeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

impl FromStr for RuntimeEnv {
    type Err = QuizConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(QuizConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Optional behavior toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    pub pwa: bool,
    pub analytics: bool,
    pub offline: bool,
}

/// Where questions come from for this configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionMode {
    Live,
    Fallback,
}

/// Returns true for values that look like an unfilled API key template.
#[must_use]
pub fn is_placeholder_api_key(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        return true;
    }
    if trimmed.chars().all(|ch| ch == 'x' || ch == 'X') {
        return true;
    }
    let lowered = trimmed.to_ascii_lowercase();
    PLACEHOLDER_KEYS.contains(&lowered.as_str())
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Unvalidated configuration values; `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct QuizConfigDraft {
    pub environment: Option<RuntimeEnv>,
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub features: FeatureFlags,
}

impl QuizConfigDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the value of `field` so the default applies.
    pub fn reset_field(&mut self, field: ConfigField) {
        match field {
            ConfigField::ApiBaseUrl => self.api_base_url = None,
            ConfigField::RequestTimeout => self.request_timeout_ms = None,
            ConfigField::MaxAttempts => self.max_attempts = None,
            ConfigField::RetryDelay => self.retry_delay_ms = None,
        }
    }

    /// Validate and normalize the draft into an immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns `QuizConfigError` for the first field that is present but invalid.
    pub fn validate(self) -> Result<QuizConfig, QuizConfigError> {
        let api_base_url = normalize_optional(self.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        match Url::parse(&api_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(QuizConfigError::InvalidBaseUrl(api_base_url)),
        }

        let timeout_ms = self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        if !REQUEST_TIMEOUT_RANGE_MS.contains(&timeout_ms) {
            return Err(QuizConfigError::InvalidRequestTimeout(timeout_ms));
        }

        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if !MAX_ATTEMPTS_RANGE.contains(&max_attempts) {
            return Err(QuizConfigError::InvalidMaxAttempts(max_attempts));
        }

        let retry_delay_ms = self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS);
        if !RETRY_DELAY_RANGE_MS.contains(&retry_delay_ms) {
            return Err(QuizConfigError::InvalidRetryDelay(retry_delay_ms));
        }

        Ok(QuizConfig {
            environment: self.environment.unwrap_or_default(),
            api_base_url,
            api_key: normalize_optional(self.api_key),
            request_timeout: Duration::from_millis(timeout_ms),
            max_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
            features: self.features,
        })
    }
}

/// Resolved quiz configuration. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct QuizConfig {
    environment: RuntimeEnv,
    api_base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
    max_attempts: u32,
    retry_delay: Duration,
    features: FeatureFlags,
}

impl QuizConfig {
    #[must_use]
    pub fn environment(&self) -> RuntimeEnv {
        self.environment
    }

    #[must_use]
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    #[must_use]
    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// True when an API key is set and is not a template placeholder.
    #[must_use]
    pub fn has_usable_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !is_placeholder_api_key(key))
    }

    /// Live questions need a usable key and the offline flag cleared.
    #[must_use]
    pub fn question_mode(&self) -> QuestionMode {
        if self.features.offline || !self.has_usable_api_key() {
            QuestionMode::Fallback
        } else {
            QuestionMode::Live
        }
    }

    /// Copy of this configuration with the offline flag forced on.
    #[must_use]
    pub fn into_offline(mut self) -> Self {
        self.features.offline = true;
        self
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            environment: RuntimeEnv::Development,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            features: FeatureFlags::default(),
        }
    }
}

impl fmt::Debug for QuizConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizConfig")
            .field("environment", &self.environment)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("features", &self.features)
            .finish()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
