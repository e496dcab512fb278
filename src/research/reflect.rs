use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{parse, prompts};
use crate::llm::{LanguageModel, ModelRequest};

/// Outcome of reflecting on the running summary. No follow-up query means stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflection {
    pub knowledge_gap: String,
    pub follow_up_query: Option<String>,
}

impl Reflection {
    pub fn no_gap() -> Self {
        Self::default()
    }

    pub fn gap(knowledge_gap: impl Into<String>, follow_up_query: impl Into<String>) -> Self {
        Self {
            knowledge_gap: knowledge_gap.into(),
            follow_up_query: Some(follow_up_query.into()),
        }
    }
}

/// Decides whether the summary leaves a gap worth another search.
///
/// Implementations must not fail: ambiguity resolves to [`Reflection::no_gap`].
#[async_trait]
pub trait Reflector: Send + Sync {
    async fn reflect(&self, topic: &str, running_summary: &str) -> Reflection;
}

/// Asks the language model to name a knowledge gap and a follow-up query.
pub struct ModelReflector {
    llm: Arc<dyn LanguageModel>,
}

impl ModelReflector {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Reflector for ModelReflector {
    async fn reflect(&self, topic: &str, running_summary: &str) -> Reflection {
        let request = ModelRequest::json(
            prompts::reflection(topic),
            prompts::reflection_request(running_summary),
        );

        let reply = match self.llm.generate(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Reflection failed, treating as no gap");
                return Reflection::no_gap();
            }
        };

        match parse::parse_reflection(&reply) {
            Ok(reflection) => {
                debug!(
                    knowledge_gap = %reflection.knowledge_gap,
                    follow_up = ?reflection.follow_up_query,
                    "Reflection parsed"
                );
                reflection
            }
            Err(e) => {
                warn!(error = %e, reply_len = reply.len(), "Unparseable reflection, treating as no gap");
                Reflection::no_gap()
            }
        }
    }
}
