// src/resolver/mod.rs
//! News resolver: asks the search provider for one AI research item,
//! unwraps its reply, and validates it into a `NewsRecord`.

pub mod prompt;
pub mod provider;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use self::prompt::SearchPrompt;
use self::provider::DynSearchProvider;

/// The one record a run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub title: String,
    pub summary: String,
    pub url: String,
    /// Free text as reported by the provider; never parsed.
    pub publication_date: Option<String>,
    /// Informational only, does not gate acceptance.
    pub verified_current_month: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("search request failed: {0}")]
    Provider(String),

    #[error("search returned an empty response")]
    EmptyResponse,

    #[error("search response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("search response is not a JSON object")]
    NotAnObject,

    #[error("search response missing required field `{0}`")]
    MissingField(&'static str),
}

/// Remove a Markdown code fence around the payload.
///
/// Accepts a leading line of three backticks with an optional language tag
/// plus a closing fence, or a ```json block embedded after leading prose.
/// Anything else is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Opening fence line: backticks + optional language tag.
        let body = match rest.find('\n') {
            Some(nl) if !rest[..nl].trim().contains(char::is_whitespace) => &rest[nl + 1..],
            Some(_) => return text,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
        // Cut at the first closing fence; prose may follow it.
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }

    if let Some(start) = text.find("```json") {
        let inner = &text[start + "```json".len()..];
        let end = inner.find("```").unwrap_or(inner.len());
        return inner[..end].trim();
    }

    text
}

fn required_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &'static str,
) -> Result<String, ResolutionError> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or(ResolutionError::MissingField(key))
}

/// Parse a provider reply into a validated record.
pub fn parse_record(raw: &str) -> Result<NewsRecord, ResolutionError> {
    let payload = strip_code_fence(raw);
    if payload.is_empty() {
        return Err(ResolutionError::EmptyResponse);
    }

    let value: serde_json::Value = serde_json::from_str(payload)?;
    let obj = value.as_object().ok_or(ResolutionError::NotAnObject)?;

    let title = required_str(obj, "title")?;
    let summary = required_str(obj, "summary")?;
    let url = required_str(obj, "url")?;

    let publication_date = obj
        .get("publication_date")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let verified_current_month = obj.get("verified_current_month").and_then(|v| match v {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => s.trim().parse::<bool>().ok(),
        _ => None,
    });

    Ok(NewsRecord {
        title,
        summary,
        url,
        publication_date,
        verified_current_month,
    })
}

pub struct NewsResolver {
    provider: DynSearchProvider,
    preferred_sources: Vec<String>,
}

impl NewsResolver {
    pub fn new(provider: DynSearchProvider, preferred_sources: Vec<String>) -> Self {
        Self {
            provider,
            preferred_sources,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// One provider call, no retry, no cache.
    pub async fn resolve<Tz>(&self, now: &DateTime<Tz>) -> Result<NewsRecord, ResolutionError>
    where
        Tz: TimeZone,
    {
        let prompt = SearchPrompt::for_date(now.date_naive(), &self.preferred_sources);
        info!(
            target: "resolver",
            provider = self.provider.name(),
            month = %prompt.month_label,
            "searching for AI news"
        );

        let raw = self
            .provider
            .search(&prompt)
            .await
            .map_err(|e| ResolutionError::Provider(format!("{e:#}")))?;
        debug!(target: "resolver", response = %raw, "search response");

        let record = parse_record(&raw)?;
        info!(
            target: "resolver",
            title = %record.title,
            publication_date = record.publication_date.as_deref().unwrap_or("unknown"),
            verified_current_month = ?record.verified_current_month,
            "found news"
        );
        Ok(record)
    }
}
