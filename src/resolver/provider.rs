// src/resolver/provider.rs
//! Search provider abstraction + concrete providers.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::prompt::SearchPrompt;
use crate::config::{AgentSettings, Credentials};

/// Low-level provider: one remote call that returns the model's raw text.
/// Parsing and validation stay in the resolver so every provider shares them.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, prompt: &SearchPrompt) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynSearchProvider = Arc<dyn SearchProvider>;

/// Factory: build a provider according to settings and environment.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock provider.
/// * Else builds the OpenAI web-search provider.
pub fn build_provider(settings: &AgentSettings, creds: &Credentials) -> Result<DynSearchProvider> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockSearchProvider::replying(
            r#"{"title":"Mock AI headline","summary":"Mock researchers did something measurable, enabling a mock impact.","url":"https://example.org/mock","verified_current_month":false}"#,
        )));
    }

    let provider = OpenAiSearchProvider::new(
        &settings.openai_base_url,
        &creds.openai_api_key,
        &settings.model,
    )?
    .with_search_context_size(&settings.search_context_size)
    .with_timeout(Duration::from_secs(settings.search_timeout_secs));
    Ok(Arc::new(provider))
}

// ------------------------------------------------------------
// OpenAI Responses API with the web_search_preview tool
// ------------------------------------------------------------

pub struct OpenAiSearchProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    search_context_size: String,
    timeout: Duration,
}

impl OpenAiSearchProvider {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ai-news-agent/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            search_context_size: "high".to_string(),
            timeout: Duration::from_secs(120),
        })
    }

    pub fn with_search_context_size(mut self, size: &str) -> Self {
        self.search_context_size = size.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/responses", self.base_url)
    }
}

#[derive(Serialize)]
struct Tool<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    search_context_size: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    tools: Vec<Tool<'a>>,
    input: &'a str,
}

#[derive(Deserialize, Default)]
struct Resp {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl Resp {
    /// Concatenate every `output_text` part of every `message` item.
    fn text(self) -> String {
        if let Some(t) = self.output_text.filter(|t| !t.trim().is_empty()) {
            return t;
        }
        self.output
            .into_iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait::async_trait]
impl SearchProvider for OpenAiSearchProvider {
    async fn search(&self, prompt: &SearchPrompt) -> Result<String> {
        let req = Req {
            model: &self.model,
            tools: vec![Tool {
                kind: "web_search_preview",
                search_context_size: &self.search_context_size,
            }],
            input: &prompt.text,
        };

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("OpenAI request timed out after {:?}", self.timeout)
                } else {
                    anyhow::Error::new(e).context("OpenAI request failed")
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, truncate(&body, 300));
        }

        let body: Resp = resp.json().await.context("decoding OpenAI response")?;
        let text = body.text();
        tracing::debug!(target: "resolver", chars = text.len(), "OpenAI output text");
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ------------------------------------------------------------
// Mock provider for tests/local runs
// ------------------------------------------------------------

/// Replays a fixed reply (or failure) and records the prompts it was given.
pub struct MockSearchProvider {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<SearchPrompt>>,
}

impl MockSearchProvider {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn last_prompt(&self) -> Option<SearchPrompt> {
        self.prompts.lock().ok().and_then(|p| p.last().cloned())
    }
}

#[async_trait::async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, prompt: &SearchPrompt) -> Result<String> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.clone());
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(msg) => bail!("{msg}"),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_text_is_collected_from_message_items() {
        let raw = r#"{
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "{\"title\":", "annotations": []},
                    {"type": "output_text", "text": "\"T\"}"}
                ]}
            ]
        }"#;
        let resp: Resp = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text(), r#"{"title":"T"}"#);
    }

    #[test]
    fn top_level_output_text_wins() {
        let raw = r#"{"output_text": "hello", "output": []}"#;
        let resp: Resp = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text(), "hello");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("žluťoučký", 3), "žlu");
        assert_eq!(truncate("ab", 10), "ab");
    }
}
