//! Process configuration, loaded once from environment variables at startup.

use std::fmt;
use std::path::PathBuf;

use reqwest::Url;

use crate::error::ConfigError;

/// Model requested when `ROUTERCHAT_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";

pub const API_KEY_VAR: &str = "API_KEY";
pub const API_URL_VAR: &str = "API_URL";
const API_KEY_FALLBACK_VAR: &str = "OPENROUTER_API_KEY";
const API_URL_FALLBACK_VAR: &str = "OPENROUTER_URL";
const MODEL_VAR: &str = "ROUTERCHAT_MODEL";
const LOG_VAR: &str = "ROUTERCHAT_LOG";
const LOG_DIR_VAR: &str = "ROUTERCHAT_LOG_DIR";

/// Immutable runtime configuration, passed by reference to the components
/// that need it.
#[derive(Clone)]
pub struct Config {
    /// Bearer credential for the completion endpoint.
    pub api_key: String,

    /// Chat completion endpoint, e.g. `https://openrouter.ai/api/v1/chat/completions`.
    pub api_url: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// `tracing` filter string. Logging is disabled when `None`.
    pub log_filter: Option<String>,

    /// Directory for the log file.
    pub log_dir: Option<PathBuf>,
}

/// Load a `.env` file from the working directory (or a parent) into the
/// process environment. Variables that are already set are left alone; a
/// missing file is not an error.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Config {
    /// Build [`Config`] from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary variable source. Empty values are
    /// treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var(API_KEY_VAR)
            .or_else(|| var(API_KEY_FALLBACK_VAR))
            .ok_or_else(|| ConfigError::missing(API_KEY_VAR))?;
        let api_url = var(API_URL_VAR)
            .or_else(|| var(API_URL_FALLBACK_VAR))
            .ok_or_else(|| ConfigError::missing(API_URL_VAR))?;

        Url::parse(&api_url).map_err(|e| ConfigError::invalid_url(&api_url, e))?;

        Ok(Self {
            api_key,
            api_url,
            model: var(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            log_filter: var(LOG_VAR),
            log_dir: var(LOG_DIR_VAR)
                .map(PathBuf::from)
                .or_else(|| dirs::data_local_dir().map(|p| p.join("routerchat"))),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("log_filter", &self.log_filter)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
