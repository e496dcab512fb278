use std::time::Duration;

use tracing::{debug, warn};

use super::{call_provider, parse, prompts};
use crate::llm::{LanguageModel, ModelRequest};

/// A search query plus the model's reason for it (logged, not used downstream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    pub query: String,
    pub rationale: String,
}

/// Ask the model for a search query. Never fails: any provider or parse error
/// falls back to the topic verbatim.
pub async fn generate_query(
    llm: &dyn LanguageModel,
    topic: &str,
    running_summary: &str,
    timeout: Duration,
) -> GeneratedQuery {
    let request = ModelRequest::json(
        prompts::query_writer(topic, &prompts::current_date()),
        prompts::query_request(running_summary),
    );

    let reply = match call_provider(timeout, llm.generate(&request)).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Query generation failed, searching for the topic verbatim");
            return fallback(topic);
        }
    };

    match parse::parse_query(&reply) {
        Ok(generated) => {
            debug!(query = %generated.query, rationale = %generated.rationale, "Query generated");
            generated
        }
        Err(e) => {
            warn!(error = %e, reply_len = reply.len(), "Unparseable query reply, searching for the topic verbatim");
            fallback(topic)
        }
    }
}

fn fallback(topic: &str) -> GeneratedQuery {
    GeneratedQuery {
        query: topic.to_string(),
        rationale: String::new(),
    }
}
