use thiserror::Error;

/// Startup configuration failures. All of them are fatal: the session never
/// becomes interactive.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing API Key or URL: {key} is not set")]
    Missing { key: &'static str },

    #[error("Invalid API URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("Could not read .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

impl ConfigError {
    pub fn missing(key: &'static str) -> Self {
        Self::Missing { key }
    }

    pub fn invalid_url(value: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
