use serde::Serialize;

use crate::search::SourceDocument;

/// Where the loop controller currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Init,
    Querying,
    Searching,
    Summarizing,
    Reflecting,
    Finalizing,
}

/// The documents one search returned, tagged with the iteration that ran it.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    pub loop_index: u32,
    pub query: String,
    pub documents: Vec<SourceDocument>,
}

/// Per-request research state. Created fresh for every run and never shared.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchState {
    topic: String,
    pub phase: Phase,
    pub current_query: String,
    /// Append-only; see [`ResearchState::record_sources`]
    sources_gathered: Vec<SourceRecord>,
    pub research_loop_count: u32,
    pub running_summary: String,
    pub knowledge_gap_query: Option<String>,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            phase: Phase::Init,
            current_query: String::new(),
            sources_gathered: Vec::new(),
            research_loop_count: 0,
            running_summary: String::new(),
            knowledge_gap_query: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn sources_gathered(&self) -> &[SourceRecord] {
        &self.sources_gathered
    }

    /// Every document gathered so far, oldest first.
    pub fn all_documents(&self) -> impl Iterator<Item = &SourceDocument> {
        self.sources_gathered.iter().flat_map(|r| r.documents.iter())
    }

    pub fn record_sources(&mut self, documents: Vec<SourceDocument>) {
        self.sources_gathered.push(SourceRecord {
            loop_index: self.research_loop_count,
            query: self.current_query.clone(),
            documents,
        });
    }

    /// Every query that was actually searched, in order.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.sources_gathered.iter().map(|r| r.query.as_str())
    }
}
