//! Iterative web research agent.
//!
//! Given a topic, the engine alternates between writing a search query,
//! searching the web, folding the results into a running summary, and
//! reflecting on what is still missing. It stops when the loop budget runs
//! out or the reflector finds no gap, then emits a report with deduplicated
//! citations.
//!
//! ```ignore
//! use deep_researcher::{ConfigOverrides, ResearchEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = ResearchEngine::from_env(ConfigOverrides::default())?;
//! let outcome = engine.run("renewable energy storage", &CancellationToken::new()).await?;
//! println!("{}", outcome.report);
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod research;
pub mod search;
pub mod state;

pub use config::{ConfigOverrides, Credentials, ResearchConfig};
pub use error::{ParseError, ProviderError, ResearchError, Result};
pub use llm::{LanguageModel, LlmClient, ModelRequest};
pub use research::citations::Citation;
pub use research::reflect::{ModelReflector, Reflection, Reflector};
pub use research::{ResearchEngine, ResearchOutcome};
pub use search::{SearchProvider, SourceDocument, TavilyClient};
pub use state::{Phase, ResearchState, SourceRecord};
