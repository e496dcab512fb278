pub mod citations;
pub mod parse;
pub mod prompts;
pub mod query;
pub mod reflect;
pub mod summarize;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigOverrides, Credentials, ResearchConfig};
use crate::error::{ProviderError, ResearchError, Result};
use crate::llm::{LanguageModel, LlmClient};
use crate::search::{SearchProvider, TavilyClient};
use crate::state::{Phase, ResearchState};

use reflect::{ModelReflector, Reflection, Reflector};

/// The final report plus the terminal state, for inspection.
#[derive(Debug)]
pub struct ResearchOutcome {
    pub report: String,
    pub state: ResearchState,
}

/// Drives the query → search → summarize → reflect loop.
///
/// Holds no per-request state, so one engine can serve concurrent runs.
pub struct ResearchEngine {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
    reflector: Arc<dyn Reflector>,
    config: ResearchConfig,
}

impl ResearchEngine {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
    ) -> Self {
        let reflector = Arc::new(ModelReflector::new(llm.clone()));
        Self {
            llm,
            search,
            reflector,
            config,
        }
    }

    /// Build an engine on the bundled Groq/Tavily clients from `.env` and the
    /// process environment, with `overrides` applied on top.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self> {
        let config = ResearchConfig::from_env()?.with_overrides(overrides);
        config.validate()?;
        let credentials = Credentials::from_env()?;

        let llm = LlmClient::new(&config, &credentials)
            .map_err(|e| ResearchError::Config(format!("{e:#}")))?;
        let search = TavilyClient::new(&config, &credentials)
            .map_err(|e| ResearchError::Config(format!("{e:#}")))?;

        Ok(Self::new(Arc::new(llm), Arc::new(search), config))
    }

    /// Replace the model-backed gap detection.
    pub fn with_reflector(mut self, reflector: Arc<dyn Reflector>) -> Self {
        self.reflector = reflector;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research `topic` until the loop budget runs out or no gap remains.
    ///
    /// Only configuration errors, an empty topic, or cancellation fail the run;
    /// provider and parse failures degrade the report instead.
    pub async fn run(&self, topic: &str, cancel: &CancellationToken) -> Result<ResearchOutcome> {
        let mut state = ResearchState::new(topic.trim());

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(&state));
            }

            if state.phase == Phase::Finalizing {
                let report = citations::render_report(&state);
                info!(
                    loops = state.research_loop_count,
                    batches = state.sources_gathered().len(),
                    report_len = report.len(),
                    "Research complete"
                );
                return Ok(ResearchOutcome { report, state });
            }

            debug!(phase = ?state.phase, loops = state.research_loop_count, "Entering phase");
            // An in-flight provider call is dropped as soon as the token fires.
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = self.advance(&mut state) => Some(next?),
            };
            match next {
                Some(phase) => state.phase = phase,
                None => return Err(cancelled(&state)),
            }
        }
    }

    /// Run one non-terminal phase and return the phase that follows it.
    async fn advance(&self, state: &mut ResearchState) -> Result<Phase> {
        let next = match state.phase {
            Phase::Init => {
                if state.topic().is_empty() {
                    return Err(ResearchError::InvalidTopic);
                }
                self.config.validate()?;
                info!(
                    topic = state.topic(),
                    max_loops = self.config.max_research_loops,
                    model = %self.config.model,
                    "Starting research"
                );
                Phase::Querying
            }
            Phase::Querying => {
                self.next_query(state).await;
                Phase::Searching
            }
            Phase::Searching => {
                web::web_research(self.search.as_ref(), state, &self.config).await;
                Phase::Summarizing
            }
            Phase::Summarizing => {
                summarize::summarize_sources(self.llm.as_ref(), state, &self.config).await;
                state.research_loop_count += 1;
                Phase::Reflecting
            }
            Phase::Reflecting => {
                let reflection = self.reflect(state).await;
                self.route(state, reflection)
            }
            Phase::Finalizing => Phase::Finalizing,
        };
        Ok(next)
    }

    /// First iteration asks the model; later ones consume the reflector's query.
    async fn next_query(&self, state: &mut ResearchState) {
        let query = match state.knowledge_gap_query.take() {
            Some(gap_query) if state.research_loop_count > 0 => gap_query,
            _ => {
                query::generate_query(
                    self.llm.as_ref(),
                    state.topic(),
                    &state.running_summary,
                    self.config.provider_timeout,
                )
                .await
                .query
            }
        };
        info!(loop_index = state.research_loop_count, query = %query, "Query selected");
        state.current_query = query;
    }

    async fn reflect(&self, state: &ResearchState) -> Reflection {
        let reflecting = self.reflector.reflect(state.topic(), &state.running_summary);
        match tokio::time::timeout(self.config.provider_timeout, reflecting).await {
            Ok(reflection) => reflection,
            Err(_) => {
                warn!(timeout = ?self.config.provider_timeout, "Reflection timed out, treating as no gap");
                Reflection::no_gap()
            }
        }
    }

    /// The loop budget overrides whatever the reflector decided.
    fn route(&self, state: &mut ResearchState, reflection: Reflection) -> Phase {
        if state.research_loop_count >= self.config.max_research_loops {
            info!(loops = state.research_loop_count, "Loop budget reached");
            return Phase::Finalizing;
        }
        let follow_up = reflection
            .follow_up_query
            .filter(|q| !q.trim().is_empty());
        match follow_up {
            Some(follow_up) => {
                info!(knowledge_gap = %reflection.knowledge_gap, follow_up = %follow_up, "Knowledge gap found");
                state.knowledge_gap_query = Some(follow_up);
                Phase::Querying
            }
            None => {
                info!(loops = state.research_loop_count, "No knowledge gap reported");
                Phase::Finalizing
            }
        }
    }
}

fn cancelled(state: &ResearchState) -> ResearchError {
    warn!(
        phase = ?state.phase,
        loops = state.research_loop_count,
        "Research cancelled, discarding partial results"
    );
    ResearchError::Cancelled
}

/// Await a provider call under a deadline, folding the timeout into `ProviderError`.
pub(crate) async fn call_provider<T, F>(timeout: Duration, call: F) -> std::result::Result<T, ProviderError>
where
    F: Future<Output = std::result::Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    }
}
