use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Credentials, ResearchConfig};
use crate::error::ProviderError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// One model call: a system prompt, a user prompt, and whether a JSON object is wanted.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub structured: bool,
}

impl ModelRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            structured: false,
        }
    }

    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            structured: true,
        }
    }

    fn messages(&self) -> [Message; 2] {
        [
            Message {
                role: "system".to_string(),
                content: self.system.clone(),
            },
            Message {
                role: "user".to_string(),
                content: self.user.clone(),
            },
        ]
    }
}

/// A chat model backend. Returns the raw text of the reply.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ProviderError>;
}

/// Client for any OpenAI-compatible chat completions endpoint (Groq by default).
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl LlmClient {
    pub fn new(config: &ResearchConfig, credentials: &Credentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout + Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: credentials.llm_base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: credentials.llm_api_key.clone(),
        })
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn body(&self, request: &ModelRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages(),
            "temperature": self.temperature,
        });
        if request.structured {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.body(request))
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = ProviderError::check_status(status, resp.text().await?)?;

        let content = extract_content(&text)?;
        debug!(
            model = %self.model,
            structured = request.structured,
            response_len = content.len(),
            "chat completion received"
        );
        Ok(content)
    }
}

/// Pull `choices[0].message.content` out of a completion body.
fn extract_content(body: &str) -> Result<String, ProviderError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("not JSON: {e}")))?;

    json["choices"]
        .get(0)
        .and_then(|c| c["message"]["content"].as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ProviderError::MalformedResponse("no choices[0].message.content".into()))
}
