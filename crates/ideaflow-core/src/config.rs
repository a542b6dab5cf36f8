//! Runtime configuration, resolved from the environment before a run starts.
//!
//! A missing credential is the only fault allowed to stop the program before
//! any model call. Everything else has a working default pointing at the
//! Gemini OpenAI-compatible endpoint.

use std::path::PathBuf;
use std::time::Duration;

use crate::driver::DriverConfig;
use crate::error::{PipelineError, Result};

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// OpenAI-compatible Gemini endpoint used when no override is given.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Per-request deadline. A single hung call must not stall the whole run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_OUT_DIR: &str = "reports";

/// Everything the pipeline needs to talk to the model service and bound a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub out_dir: PathBuf,
    pub driver: DriverConfig,
}

impl PipelineConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an injected lookup, for tests.
    ///
    /// Reads `GOOGLE_API_KEY` (required, must be non-blank) and the optional
    /// overrides `IDEAFLOW_BASE_URL`, `IDEAFLOW_MODEL`,
    /// `IDEAFLOW_TIMEOUT_SECS`, and `IDEAFLOW_OUT_DIR`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                PipelineError::Config(format!("{API_KEY_ENV} is not set or is empty"))
            })?;

        let base_url = lookup("IDEAFLOW_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = lookup("IDEAFLOW_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout_secs = match lookup("IDEAFLOW_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                PipelineError::Config(format!("IDEAFLOW_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let out_dir = lookup("IDEAFLOW_OUT_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));

        Ok(Self {
            api_key,
            base_url,
            model,
            request_timeout: Duration::from_secs(timeout_secs),
            out_dir,
            driver: DriverConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config =
            PipelineConfig::from_lookup(lookup_from(&[(API_KEY_ENV, "sk-test")])).unwrap();

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.out_dir, PathBuf::from("reports"));
        assert_eq!(config.driver.message_ceiling, 12);
        assert_eq!(config.driver.safety_ceiling, 15);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = PipelineConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn blank_key_is_rejected_like_a_missing_one() {
        let err =
            PipelineConfig::from_lookup(lookup_from(&[(API_KEY_ENV, "   ")])).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn overrides_take_effect() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV, "sk-test"),
            ("IDEAFLOW_BASE_URL", "http://localhost:8080/v1/"),
            ("IDEAFLOW_MODEL", "gemini-2.5-pro"),
            ("IDEAFLOW_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080/v1/");
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn non_numeric_timeout_is_a_config_error() {
        let err = PipelineConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV, "sk-test"),
            ("IDEAFLOW_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
