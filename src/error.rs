//! Error types for the research loop and its providers.

use thiserror::Error;

/// Failure of a model or search backend. Always absorbed by the loop.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP 429
    #[error("rate limited by provider")]
    RateLimited,

    /// The per-call deadline elapsed
    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Body was not the shape the client expects
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().map(|s| s.as_u16()) == Some(429) {
            return ProviderError::RateLimited;
        }
        ProviderError::Request(e.to_string())
    }
}

impl ProviderError {
    /// Map an HTTP status and body to the body on success, or the matching error.
    pub fn check_status(status: u16, body: String) -> std::result::Result<String, ProviderError> {
        match status {
            200..=299 => Ok(body),
            429 => Err(ProviderError::RateLimited),
            _ => Err(ProviderError::Status { status, body }),
        }
    }
}

/// Model output did not match the expected structured shape.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),
}

/// Errors that reach the caller of a research run.
#[derive(Error, Debug)]
pub enum ResearchError {
    /// Invalid loop budget, temperature, or missing credential
    #[error("configuration error: {0}")]
    Config(String),

    #[error("research topic must not be empty")]
    InvalidTopic,

    /// The cancellation token fired before the run finished
    #[error("research run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ResearchError>;
