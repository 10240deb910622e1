use std::env;
use std::fmt;
use std::time::Duration;

use crate::errors::{ConfigError, ConfigResult};

/// Bearer credential for the completion endpoint. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

pub const OPENROUTER_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// Resolve the API key through `lookup`. `OPENROUTER_API_KEY` wins over
/// `OPENAI_API_KEY`; empty values count as unset.
pub fn resolve_api_key_with<F>(lookup: F) -> ConfigResult<ApiKey>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str| lookup(key).filter(|value| !value.is_empty());
    let openrouter = read(OPENROUTER_KEY_VAR);
    let openai = read(OPENAI_KEY_VAR);

    match (openrouter, openai) {
        (Some(key), _) | (None, Some(key)) => Ok(ApiKey(key)),
        (None, None) => Err(ConfigError::MissingApiKey {
            openrouter_present: false,
            openai_present: false,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub http_timeout_ms: u64,
}

impl ClientConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";
    pub const DEFAULT_MODEL: &'static str = "openai/gpt-oss-20b:free";
    const DEFAULT_TIMEOUT_MS: u64 = 60_000;

    const BASE_URL_VARS: [&'static str; 2] = ["OPENROUTER_BASE_URL", "OPENAI_BASE_URL"];
    const MODEL_VARS: [&'static str; 1] = ["OPENROUTER_MODEL"];
    const TIMEOUT_VARS: [&'static str; 1] = ["OPENROUTER_HTTP_TIMEOUT_MS"];

    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from `lookup`, which stands in for the environment.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = resolve_api_key_with(&lookup)?;

        Ok(Self {
            api_key,
            base_url: read_env(&lookup, &Self::BASE_URL_VARS)
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            http_timeout_ms: Self::timeout_from(&lookup)?,
        })
    }

    /// Model identifier from `OPENROUTER_MODEL`, falling back to the published default.
    pub fn model_from_env() -> String {
        read_env(|key| env::var(key).ok(), &Self::MODEL_VARS)
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms.max(1))
    }

    fn timeout_from<F>(lookup: F) -> ConfigResult<u64>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw) = read_env(lookup, &Self::TIMEOUT_VARS) else {
            return Ok(Self::DEFAULT_TIMEOUT_MS);
        };

        raw.trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout {
                var: Self::TIMEOUT_VARS[0].to_string(),
                value: raw.clone(),
            })
    }
}

fn read_env<F>(lookup: F, candidates: &[&'static str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    candidates
        .iter()
        .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
}
