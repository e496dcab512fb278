use std::str::FromStr;
use std::time::Duration;

use crate::error::{ResearchError, Result};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Tunable research parameters. Every field has a default and an env var.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    pub model: String,
    pub temperature: f32,
    pub max_research_loops: u32,
    pub fetch_full_page: bool,
    pub strip_thinking_tokens: bool,
    pub max_results: usize,
    /// Rough budget per source when full pages are included (4 chars per token)
    pub max_tokens_per_source: usize,
    pub provider_timeout: Duration,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.0,
            max_research_loops: 3,
            fetch_full_page: true,
            strip_thinking_tokens: true,
            max_results: 3,
            max_tokens_per_source: 1000,
            provider_timeout: Duration::from_secs(120),
        }
    }
}

/// Caller-supplied overrides applied on top of env/defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_research_loops: Option<u32>,
    pub fetch_full_page: Option<bool>,
    pub strip_thinking_tokens: Option<bool>,
    pub max_results: Option<usize>,
}

impl ResearchConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys keep their defaults;
    /// set but unparseable keys are a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", defaults.temperature)?,
            max_research_loops: parse_or(
                get("MAX_WEB_RESEARCH_LOOPS"),
                "MAX_WEB_RESEARCH_LOOPS",
                defaults.max_research_loops,
            )?,
            fetch_full_page: bool_or(get("FETCH_FULL_PAGE"), "FETCH_FULL_PAGE", defaults.fetch_full_page)?,
            strip_thinking_tokens: bool_or(
                get("STRIP_THINKING_TOKENS"),
                "STRIP_THINKING_TOKENS",
                defaults.strip_thinking_tokens,
            )?,
            max_results: parse_or(get("SEARCH_MAX_RESULTS"), "SEARCH_MAX_RESULTS", defaults.max_results)?,
            max_tokens_per_source: parse_or(
                get("MAX_TOKENS_PER_SOURCE"),
                "MAX_TOKENS_PER_SOURCE",
                defaults.max_tokens_per_source,
            )?,
            provider_timeout: parse_or(get("PROVIDER_TIMEOUT_SECS"), "PROVIDER_TIMEOUT_SECS", 120u64)
                .map(Duration::from_secs)?,
        })
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(t) = overrides.temperature {
            self.temperature = t;
        }
        if let Some(n) = overrides.max_research_loops {
            self.max_research_loops = n;
        }
        if let Some(b) = overrides.fetch_full_page {
            self.fetch_full_page = b;
        }
        if let Some(b) = overrides.strip_thinking_tokens {
            self.strip_thinking_tokens = b;
        }
        if let Some(n) = overrides.max_results {
            self.max_results = n;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_research_loops < 1 {
            return Err(ResearchError::Config(
                "max_research_loops must be at least 1".to_string(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ResearchError::Config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ResearchError::Config("model must not be empty".to_string()));
        }
        if self.max_results == 0 {
            return Err(ResearchError::Config("max_results must be at least 1".to_string()));
        }
        if self.provider_timeout.is_zero() {
            return Err(ResearchError::Config(
                "provider timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// API credentials and endpoints for the bundled HTTP clients.
#[derive(Clone)]
pub struct Credentials {
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub tavily_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_api_key", &"<redacted>")
            .field("tavily_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_api_key = get("LLM_API_KEY")
            .or_else(|| get("GROQ_API_KEY"))
            .ok_or_else(|| {
                ResearchError::Config("LLM_API_KEY (or GROQ_API_KEY) is not set".to_string())
            })?;
        let tavily_api_key = get("TAVILY_API_KEY")
            .ok_or_else(|| ResearchError::Config("TAVILY_API_KEY is not set".to_string()))?;
        let llm_base_url = get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            llm_base_url,
            llm_api_key,
            tavily_api_key,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ResearchError::Config(format!("{key}: cannot parse `{v}`"))),
    }
}

fn bool_or(raw: Option<String>, key: &str, default: bool) -> Result<bool> {
    match raw.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ResearchError::Config(format!("{key}: expected a boolean, got `{v}`"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ResearchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResearchConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_values_parsed() {
        let config = ResearchConfig::from_lookup(lookup(&[
            ("LLM_MODEL", "qwen/qwen3-32b"),
            ("LLM_TEMPERATURE", "0.1"),
            ("MAX_WEB_RESEARCH_LOOPS", "5"),
            ("FETCH_FULL_PAGE", "false"),
            ("STRIP_THINKING_TOKENS", "0"),
            ("PROVIDER_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.model, "qwen/qwen3-32b");
        assert_eq!(config.max_research_loops, 5);
        assert!(!config.fetch_full_page);
        assert!(!config.strip_thinking_tokens);
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_unparseable_value_is_config_error() {
        let err = ResearchConfig::from_lookup(lookup(&[("MAX_WEB_RESEARCH_LOOPS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));

        let err = ResearchConfig::from_lookup(lookup(&[("FETCH_FULL_PAGE", "maybe")])).unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }

    #[test]
    fn test_overrides_win() {
        let config = ResearchConfig::default().with_overrides(ConfigOverrides {
            max_research_loops: Some(7),
            strip_thinking_tokens: Some(false),
            ..Default::default()
        });
        assert_eq!(config.max_research_loops, 7);
        assert!(!config.strip_thinking_tokens);
        assert_eq!(config.model, ResearchConfig::default().model);
    }

    #[test]
    fn test_validate_rejects_zero_loops_and_bad_temperature() {
        let zero = ResearchConfig {
            max_research_loops: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let negative = ResearchConfig {
            temperature: -0.5,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let nan = ResearchConfig {
            temperature: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_credentials_fallback_and_missing() {
        let creds = Credentials::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap();
        assert_eq!(creds.llm_api_key, "gsk-test");
        assert_eq!(creds.llm_base_url, DEFAULT_BASE_URL);
        assert!(!format!("{:?}", creds).contains("gsk-test"));

        let err = Credentials::from_lookup(lookup(&[("LLM_API_KEY", "k")])).unwrap_err();
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }
}
