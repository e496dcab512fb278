use tracing::{debug, info, warn};

use super::web::format_sources_for_prompt;
use super::{call_provider, parse, prompts};
use crate::config::ResearchConfig;
use crate::llm::{LanguageModel, ModelRequest};
use crate::state::ResearchState;

/// Merge the latest search batch into the running summary.
///
/// Returns whether the summary was replaced. On any failure, or when the
/// batch is empty, the previous summary stays as it was.
pub async fn summarize_sources(
    llm: &dyn LanguageModel,
    state: &mut ResearchState,
    config: &ResearchConfig,
) -> bool {
    let Some(latest) = state.sources_gathered().last() else {
        return false;
    };
    if latest.documents.is_empty() {
        debug!(loop_index = latest.loop_index, "No new sources, keeping summary");
        return false;
    }

    let context = format_sources_for_prompt(
        &latest.documents,
        config.max_tokens_per_source,
        config.fetch_full_page,
    );
    let request = ModelRequest::text(
        prompts::SUMMARIZER_INSTRUCTIONS,
        prompts::summarize_request(state.topic(), &state.running_summary, &context),
    );

    let reply = match call_provider(config.provider_timeout, llm.generate(&request)).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Summarization failed, keeping previous summary");
            return false;
        }
    };

    let summary = if config.strip_thinking_tokens {
        parse::strip_thinking_tokens(&reply)
    } else {
        reply.trim().to_string()
    };

    if summary.is_empty() {
        warn!(reply_len = reply.len(), "Summarizer returned nothing usable, keeping previous summary");
        return false;
    }

    info!(
        previous_len = state.running_summary.len(),
        summary_len = summary.len(),
        "Running summary updated"
    );
    state.running_summary = summary;
    true
}
