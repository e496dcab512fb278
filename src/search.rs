use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Credentials, ResearchConfig};
use crate::error::ProviderError;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// One web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Snippet / most relevant content
    #[serde(default)]
    pub content: String,
    /// Full page text, only when full-page fetching is on
    #[serde(default)]
    pub raw_content: Option<String>,
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SourceDocument>, ProviderError>;
}

/// Keep the first document for each URL, preserving order.
pub fn dedupe_by_url(docs: Vec<SourceDocument>) -> Vec<SourceDocument> {
    let mut seen = HashSet::new();
    docs.into_iter()
        .filter(|d| seen.insert(d.url.clone()))
        .collect()
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SourceDocument>,
}

/// Tavily search API client.
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
}

impl TavilyClient {
    pub fn new(config: &ResearchConfig, credentials: &Credentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout + Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: credentials.tavily_api_key.clone(),
        })
    }

    /// Fill in raw content for documents the search API returned without it.
    async fn backfill_raw_content(&self, docs: &mut [SourceDocument]) {
        let missing = missing_raw_content(docs);
        if missing.is_empty() {
            return;
        }

        let fetches = missing
            .iter()
            .map(|&i| fetch_raw_content(&self.client, &docs[i].url));
        let pages = futures::future::join_all(fetches).await;

        apply_pages(docs, &missing, pages);
    }
}

fn missing_raw_content(docs: &[SourceDocument]) -> Vec<usize> {
    docs.iter()
        .enumerate()
        .filter(|(_, d)| d.raw_content.as_deref().map_or(true, str::is_empty))
        .map(|(i, _)| i)
        .collect()
}

/// Write each fetched page back to the document it was fetched for.
fn apply_pages(docs: &mut [SourceDocument], missing: &[usize], pages: Vec<Option<String>>) {
    for (&i, page) in missing.iter().zip(pages) {
        docs[i].raw_content = page;
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SourceDocument>, ProviderError> {
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
            "include_raw_content": fetch_full_page,
        });

        let resp = self
            .client
            .post(TAVILY_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = ProviderError::check_status(status, resp.text().await?)?;

        let mut docs = parse_tavily_response(&text)?;
        if fetch_full_page {
            self.backfill_raw_content(&mut docs).await;
        }
        debug!(query, results = docs.len(), "search complete");
        Ok(docs)
    }
}

fn parse_tavily_response(body: &str) -> Result<Vec<SourceDocument>, ProviderError> {
    let parsed: TavilyResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
    Ok(parsed
        .results
        .into_iter()
        .filter_map(|mut d| {
            let url = d.url.trim();
            if url.is_empty() {
                return None;
            }
            d.url = url.to_string();
            Some(d)
        })
        .collect())
}

/// Fetch a page and convert it to plain text. `None` on any failure.
pub async fn fetch_raw_content(client: &reqwest::Client, url: &str) -> Option<String> {
    let result = async {
        let resp = client
            .get(url)
            .timeout(PAGE_FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp.bytes().await?;
        Ok::<_, reqwest::Error>((content_type, body))
    }
    .await;

    match result {
        Ok((content_type, body)) => Some(page_to_text(&content_type, &body)),
        Err(e) => {
            warn!(url, error = %e, "Failed to fetch full page content");
            None
        }
    }
}

fn page_to_text(content_type: &str, body: &[u8]) -> String {
    if content_type.contains("html") {
        html2text::from_read(body, 120).unwrap_or_else(|_| String::from_utf8_lossy(body).to_string())
    } else {
        String::from_utf8_lossy(body).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str, title: &str) -> SourceDocument {
        SourceDocument {
            url: url.to_string(),
            title: title.to_string(),
            content: String::new(),
            raw_content: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let docs = vec![
            doc("https://a.example", "first"),
            doc("https://b.example", "b"),
            doc("https://a.example", "second"),
        ];
        let unique = dedupe_by_url(docs);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "first");
        assert_eq!(unique[1].url, "https://b.example");
    }

    #[test]
    fn test_parse_tavily_response() {
        let body = r#"{
            "query": "grid storage",
            "results": [
                {"title": "Batteries", "url": "https://x.example/bat", "content": "Li-ion", "score": 0.9, "raw_content": null},
                {"title": "Pumped hydro", "url": " https://y.example/hydro\n", "content": "water", "raw_content": "long text"},
                {"title": "No url", "url": "  ", "content": "dropped"}
            ]
        }"#;
        let docs = parse_tavily_response(body).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].raw_content, None);
        assert_eq!(docs[1].raw_content.as_deref(), Some("long text"));
        assert_eq!(docs[1].url, "https://y.example/hydro");
    }

    #[test]
    fn test_parse_tavily_rejects_garbage() {
        assert!(matches!(
            parse_tavily_response("rate limit exceeded"),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(parse_tavily_response("{}").unwrap().is_empty());
    }

    #[test]
    fn test_apply_pages_targets_missing_indices() {
        let mut docs = vec![
            doc("https://a.example", "a"),
            SourceDocument {
                raw_content: Some("already here".into()),
                ..doc("https://b.example", "b")
            },
            SourceDocument {
                raw_content: Some(String::new()),
                ..doc("https://c.example", "c")
            },
        ];

        let missing = missing_raw_content(&docs);
        assert_eq!(missing, vec![0, 2]);

        apply_pages(&mut docs, &missing, vec![Some("page a".into()), None]);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].raw_content.as_deref(), Some("page a"));
        assert_eq!(docs[1].raw_content.as_deref(), Some("already here"));
        assert_eq!(docs[2].raw_content, None);
    }

    #[tokio::test]
    async fn test_fetch_raw_content_unreachable_is_none() {
        let client = reqwest::Client::new();
        assert_eq!(fetch_raw_content(&client, "http://127.0.0.1:1/").await, None);
    }

    #[tokio::test]
    async fn test_backfill_failure_keeps_batch() {
        let creds = Credentials {
            llm_base_url: "http://127.0.0.1:1/v1".into(),
            llm_api_key: "k".into(),
            tavily_api_key: "t".into(),
        };
        let tavily = TavilyClient::new(&ResearchConfig::default(), &creds).unwrap();
        let mut docs = vec![
            doc("http://127.0.0.1:1/missing", "unreachable"),
            SourceDocument {
                raw_content: Some("kept".into()),
                ..doc("https://b.example", "b")
            },
        ];

        tavily.backfill_raw_content(&mut docs).await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].raw_content, None);
        assert_eq!(docs[0].title, "unreachable");
        assert_eq!(docs[1].raw_content.as_deref(), Some("kept"));
    }

    #[test]
    fn test_page_to_text_html() {
        let text = page_to_text("text/html; charset=utf-8", b"<html><body><p>Hello storage</p></body></html>");
        assert!(text.contains("Hello storage"));
        assert!(!text.contains("<p>"));

        assert_eq!(page_to_text("text/plain", b"plain"), "plain");
    }
}
