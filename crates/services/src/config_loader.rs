//! Builds a `QuizConfig` from environment variables.
//!
//! Loading never fails: every missing, unparsable or out-of-range value is
//! replaced by its default and reported as a warning.

use std::env;

use quiz_core::model::{
    is_placeholder_api_key, ConfigField, FeatureFlags, QuestionMode, QuizConfig, QuizConfigDraft,
    RuntimeEnv,
};

pub const ENV_ENVIRONMENT: &str = "QUIZ_ENV";
pub const ENV_API_BASE_URL: &str = "QUIZ_API_BASE_URL";
pub const ENV_API_KEY: &str = "QUIZ_API_KEY";
pub const ENV_API_TIMEOUT_MS: &str = "QUIZ_API_TIMEOUT_MS";
pub const ENV_API_MAX_ATTEMPTS: &str = "QUIZ_API_MAX_ATTEMPTS";
pub const ENV_API_RETRY_DELAY_MS: &str = "QUIZ_API_RETRY_DELAY_MS";
pub const ENV_FEATURE_PWA: &str = "QUIZ_FEATURE_PWA";
pub const ENV_FEATURE_ANALYTICS: &str = "QUIZ_FEATURE_ANALYTICS";
pub const ENV_FEATURE_OFFLINE: &str = "QUIZ_FEATURE_OFFLINE";

/// Resolved configuration plus the non-fatal problems found while loading it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: QuizConfig,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the process environment.
    #[must_use]
    pub fn from_env() -> LoadedConfig {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> LoadedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = read(ENV_ENVIRONMENT).and_then(|raw| match raw.parse::<RuntimeEnv>() {
            Ok(env) => Some(env),
            Err(err) => {
                warn(&mut warnings, ENV_ENVIRONMENT, &err.to_string());
                None
            }
        });

        let api_key = read(ENV_API_KEY);
        match api_key.as_deref() {
            None => warn(
                &mut warnings,
                ENV_API_KEY,
                "not set; falling back to bundled questions",
            ),
            Some(key) if is_placeholder_api_key(key) => warn(
                &mut warnings,
                ENV_API_KEY,
                "looks like a placeholder; falling back to bundled questions",
            ),
            Some(_) => {}
        }

        let mut draft = QuizConfigDraft {
            environment,
            api_base_url: read(ENV_API_BASE_URL),
            api_key,
            request_timeout_ms: parse_number(&read, ENV_API_TIMEOUT_MS, &mut warnings),
            max_attempts: parse_number(&read, ENV_API_MAX_ATTEMPTS, &mut warnings),
            retry_delay_ms: parse_number(&read, ENV_API_RETRY_DELAY_MS, &mut warnings),
            features: FeatureFlags {
                pwa: parse_flag(&read, ENV_FEATURE_PWA, &mut warnings),
                analytics: parse_flag(&read, ENV_FEATURE_ANALYTICS, &mut warnings),
                offline: parse_flag(&read, ENV_FEATURE_OFFLINE, &mut warnings),
            },
        };

        let config = loop {
            match draft.clone().validate() {
                Ok(config) => break config,
                Err(err) => {
                    let Some(field) = err.field() else {
                        warn(&mut warnings, "config", &err.to_string());
                        break QuizConfig::default();
                    };
                    warn(&mut warnings, variable_for(field), &format!("{err}; using default"));
                    draft.reset_field(field);
                }
            }
        };

        tracing::info!(
            environment = %config.environment(),
            base_url = config.api_base_url(),
            max_attempts = config.max_attempts(),
            question_mode = ?config.question_mode(),
            offline = config.features().offline,
            "quiz configuration loaded"
        );
        if config.environment().is_production() && config.question_mode() == QuestionMode::Fallback
        {
            tracing::warn!("production build is serving bundled questions only");
        }

        LoadedConfig { config, warnings }
    }
}

fn variable_for(field: ConfigField) -> &'static str {
    match field {
        ConfigField::ApiBaseUrl => ENV_API_BASE_URL,
        ConfigField::RequestTimeout => ENV_API_TIMEOUT_MS,
        ConfigField::MaxAttempts => ENV_API_MAX_ATTEMPTS,
        ConfigField::RetryDelay => ENV_API_RETRY_DELAY_MS,
    }
}

fn warn(warnings: &mut Vec<String>, variable: &str, message: &str) {
    tracing::warn!(variable, "{message}");
    warnings.push(format!("{variable}: {message}"));
}

fn parse_number<T, R>(read: &R, variable: &str, warnings: &mut Vec<String>) -> Option<T>
where
    T: std::str::FromStr,
    R: Fn(&str) -> Option<String>,
{
    let raw = read(variable)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn(warnings, variable, &format!("`{raw}` is not a valid number; using default"));
            None
        }
    }
}

fn parse_flag<R>(read: &R, variable: &str, warnings: &mut Vec<String>) -> bool
where
    R: Fn(&str) -> Option<String>,
{
    let Some(raw) = read(variable) else {
        return false;
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn(warnings, variable, &format!("`{raw}` is not a boolean; using false"));
            false
        }
    }
}
