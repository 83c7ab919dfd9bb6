//! Runtime settings loaded from environment variables (and `.env`, if present).
//!
//! - `GEMINI_API_KEY` / `API_KEY`: narrative service key (optional)
//! - `NARRATIVE_MODEL`: model name (default: gemini-2.5-flash)
//! - `NARRATIVE_BASE_URL`: REST base URL of the text-generation service
//! - `NARRATIVE_TIMEOUT_SECS`: request timeout (default: 30)
//! - `PORT`: HTTP port for `serve` (default: 8080)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_NARRATIVE_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_NARRATIVE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_NARRATIVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Clone)]
pub struct NarrativeSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_NARRATIVE_MODEL.to_string(),
            base_url: DEFAULT_NARRATIVE_BASE_URL.to_string(),
            timeout: DEFAULT_NARRATIVE_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for NarrativeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub narrative: NarrativeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            narrative: NarrativeSettings::default(),
        }
    }
}

impl NarrativeSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = NarrativeSettings::default();

        let timeout = match non_empty("NARRATIVE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>().ok() {
                Some(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "NARRATIVE_TIMEOUT_SECS",
                        expected: "positive number of seconds",
                        value: raw,
                    });
                }
            },
            None => defaults.timeout,
        };

        Ok(NarrativeSettings {
            api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
            model: non_empty("NARRATIVE_MODEL").unwrap_or(defaults.model),
            base_url: non_empty("NARRATIVE_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout,
        })
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT").filter(|value| !value.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "PORT",
                    expected: "port number",
                    value: raw,
                })?,
            None => DEFAULT_PORT,
        };

        Ok(Settings {
            port,
            narrative: NarrativeSettings::from_lookup(lookup)?,
        })
    }
}

/// Loads `.env` into the process environment and returns its path, if one was found.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}
