use std::fmt::Write as _;

use tracing::{info, warn};

use super::call_provider;
use crate::config::ResearchConfig;
use crate::search::{dedupe_by_url, SearchProvider, SourceDocument};
use crate::state::ResearchState;

/// Run one search for `state.current_query` and record the batch.
///
/// Provider failures record an empty batch so the loop keeps going.
pub async fn web_research(search: &dyn SearchProvider, state: &mut ResearchState, config: &ResearchConfig) {
    let query = state.current_query.clone();
    let result = call_provider(
        config.provider_timeout,
        search.search(&query, config.max_results, config.fetch_full_page),
    )
    .await;

    let documents = match result {
        Ok(docs) => dedupe_by_url(docs),
        Err(e) => {
            warn!(query = %query, error = %e, "Search failed, continuing with no new sources");
            Vec::new()
        }
    };

    info!(
        query = %query,
        loop_index = state.research_loop_count,
        results = documents.len(),
        "Web research complete"
    );
    state.record_sources(documents);
}

/// Render a batch of documents as prompt context. Duplicates by URL are skipped.
/// With `fetch_full_page`, raw page text is included up to roughly
/// `max_tokens_per_source` tokens (4 chars each).
pub fn format_sources_for_prompt(
    documents: &[SourceDocument],
    max_tokens_per_source: usize,
    fetch_full_page: bool,
) -> String {
    let unique = dedupe_by_url(documents.to_vec());
    let char_limit = max_tokens_per_source.saturating_mul(4);

    let mut out = String::from("Sources:\n\n");
    for doc in &unique {
        let _ = writeln!(out, "Source: {}\n===", doc.title);
        let _ = writeln!(out, "URL: {}\n===", doc.url);
        let _ = writeln!(out, "Most relevant content from source: {}\n===", doc.content);
        if fetch_full_page {
            let raw = match doc.raw_content.as_deref() {
                Some(raw) => raw,
                None => {
                    warn!(url = %doc.url, "No raw content for source");
                    ""
                }
            };
            let _ = writeln!(
                out,
                "Full source content limited to {} tokens: {}\n",
                max_tokens_per_source,
                truncate_chars(raw, char_limit)
            );
        }
    }
    out.trim().to_string()
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}... [truncated]", &text[..byte_idx]),
        None => text.to_string(),
    }
}
