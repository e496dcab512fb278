//! Scripted in-memory providers for exercising the loop without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::prompts;
use super::reflect::{Reflection, Reflector};
use crate::error::ProviderError;
use crate::llm::{LanguageModel, ModelRequest};
use crate::search::{SearchProvider, SourceDocument};

pub fn doc(url: &str, title: &str) -> SourceDocument {
    SourceDocument {
        url: url.to_string(),
        title: title.to_string(),
        content: format!("Content about {title}"),
        raw_content: None,
    }
}

type Replies = Mutex<VecDeque<Result<String, ProviderError>>>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Query,
    Summary,
    Reflection,
}

/// Routes each request by its system prompt to a queue of scripted replies.
/// An exhausted queue falls back to a well-formed default reply.
pub struct FakeModel {
    queries: Replies,
    summaries: Replies,
    reflections: Replies,
    requests: Mutex<Vec<(Role, ModelRequest)>>,
    delay: Option<Duration>,
    fail_all: bool,
}

impl FakeModel {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(VecDeque::new()),
            summaries: Mutex::new(VecDeque::new()),
            reflections: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
            fail_all: false,
        }
    }

    /// Every call fails with a provider error.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    pub fn with_queries(self, replies: Vec<Result<String, ProviderError>>) -> Self {
        self.queries.lock().unwrap().extend(replies);
        self
    }

    pub fn with_summaries(self, replies: Vec<Result<String, ProviderError>>) -> Self {
        self.summaries.lock().unwrap().extend(replies);
        self
    }

    pub fn with_reflections(self, replies: Vec<Result<String, ProviderError>>) -> Self {
        self.reflections.lock().unwrap().extend(replies);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    fn calls(&self, role: Role) -> usize {
        self.requests.lock().unwrap().iter().filter(|(r, _)| *r == role).count()
    }

    pub fn query_calls(&self) -> usize {
        self.calls(Role::Query)
    }

    pub fn summary_calls(&self) -> usize {
        self.calls(Role::Summary)
    }

    fn role_of(request: &ModelRequest) -> Role {
        if request.system == prompts::SUMMARIZER_INSTRUCTIONS {
            Role::Summary
        } else if request.system.contains("targeted web search query") {
            Role::Query
        } else {
            Role::Reflection
        }
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let role = Self::role_of(request);
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((role, request.clone()));
            requests.iter().filter(|(r, _)| *r == role).count()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all {
            return Err(ProviderError::Request("scripted failure".to_string()));
        }

        let queue = match role {
            Role::Query => &self.queries,
            Role::Summary => &self.summaries,
            Role::Reflection => &self.reflections,
        };
        if let Some(reply) = queue.lock().unwrap().pop_front() {
            return reply;
        }

        Ok(match role {
            Role::Query => format!(r#"{{"query": "generated query {n}", "rationale": "default"}}"#),
            Role::Summary => format!("Summary after pass {n}."),
            Role::Reflection => {
                format!(r#"{{"knowledge_gap": "gap {n}", "follow_up_query": "follow-up {n}"}}"#)
            }
        })
    }
}

type SearchFn = dyn Fn(&str, usize) -> Result<Vec<SourceDocument>, ProviderError> + Send + Sync;

/// Search backend driven by a closure of `(query, call_index)`.
pub struct FakeSearch {
    respond: Box<SearchFn>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Vec<SourceDocument>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
        _fetch_full_page: bool,
    ) -> Result<Vec<SourceDocument>, ProviderError> {
        let call = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.to_string());
            queries.len() - 1
        };
        (self.respond)(query, call)
    }
}

/// Reflector with a fixed answer.
pub struct FixedReflector {
    gap: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedReflector {
    pub fn always_gap() -> Self {
        Self {
            gap: true,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn no_gap() -> Self {
        Self {
            gap: false,
            ..Self::always_gap()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reflector for FixedReflector {
    async fn reflect(&self, topic: &str, _running_summary: &str) -> Reflection {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.gap {
            Reflection::gap("more detail", format!("{topic} follow-up {n}"))
        } else {
            Reflection::no_gap()
        }
    }
}
