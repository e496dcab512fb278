use std::collections::HashSet;
use std::fmt::Write as _;

use crate::state::ResearchState;

/// A source as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub url: String,
    pub label: String,
}

/// Collect citations across every gathered batch, one per URL, in first-seen order.
///
/// Blank URLs are skipped. A blank title falls back to the URL as the label.
pub fn collect_citations(state: &ResearchState) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for doc in state.all_documents() {
        let url = doc.url.as_str();
        if url.trim().is_empty() || !seen.insert(url) {
            continue;
        }
        let title = doc.title.trim();
        let label = if title.is_empty() { url } else { title };
        citations.push(Citation {
            url: url.to_string(),
            label: label.to_string(),
        });
    }

    citations
}

/// Build the final report: the running summary followed by a numbered Sources section.
pub fn render_report(state: &ResearchState) -> String {
    let summary = state.running_summary.trim();
    let body = if summary.is_empty() {
        format!(
            "No findings could be gathered for \"{}\". The search and model providers returned nothing usable.",
            state.topic()
        )
    } else {
        summary.to_string()
    };

    let mut report = format!("## Summary\n{}\n\n### Sources:\n", body);
    let citations = collect_citations(state);
    if citations.is_empty() {
        report.push_str("No sources were gathered.\n");
    }
    for (i, citation) in citations.iter().enumerate() {
        let _ = writeln!(report, "{}. [{}]({})", i + 1, escape_label(&citation.label), citation.url);
    }
    report
}

/// Keep markdown link labels intact when titles contain brackets.
fn escape_label(label: &str) -> String {
    label.replace('[', "\\[").replace(']', "\\]")
}
