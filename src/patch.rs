// src/patch.rs
//! Document patcher: a pure string transform that swaps the news region of
//! the portfolio page for a freshly rendered block.
//!
//! The page is opaque text. The region starts at `<h3>{heading}</h3>` and
//! ends at the first `</div>` followed (after optional whitespace) by another
//! `</div>`. If either end cannot be found the patch fails and the caller
//! keeps the old document.

use regex::{NoExpand, Regex};
use thiserror::Error;

use crate::resolver::NewsRecord;

pub const DEFAULT_HEADING: &str = "AI News of the month";

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("heading `{0}` not found in document")]
    MarkerNotFound(String),

    #[error("heading `{0}` found but no closing `</div></div>` follows it")]
    UnterminatedRegion(String),

    #[error("invalid heading pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("reading document {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("writing document {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct DocumentPatcher {
    heading: String,
    region: Regex,
}

impl DocumentPatcher {
    pub fn new(heading: &str) -> Result<Self, PatchError> {
        let region = Regex::new(&format!(
            r"(?s){}.*?</div>\s*</div>",
            regex::escape(&heading_tag(heading))
        ))?;
        Ok(Self {
            heading: heading.to_string(),
            region,
        })
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    /// Render the replacement block, including the outer wrapper's closing tag
    /// that the region match consumed.
    pub fn render(&self, record: &NewsRecord) -> String {
        let summary = html_escape::encode_text(&record.summary);
        let url = html_escape::encode_double_quoted_attribute(&record.url);
        format!(
            r#"{heading}
                        <div class="footer-links">
                          <p>
                            {summary}
                            <a href="{url}" target="_blank" rel="noopener noreferrer" class="ai-news-link">
                              Read more →
                            </a>
                          </p>
                        </div>
                      </div>"#,
            heading = heading_tag(&self.heading),
        )
    }

    /// Replace the first marked region. Bytes outside the match are returned unchanged.
    pub fn patch(&self, document: &str, record: &NewsRecord) -> Result<String, PatchError> {
        let Some(found) = self.region.find(document) else {
            return Err(if document.contains(&heading_tag(&self.heading)) {
                PatchError::UnterminatedRegion(self.heading.clone())
            } else {
                PatchError::MarkerNotFound(self.heading.clone())
            });
        };

        let rendered = self.render(record);
        tracing::debug!(
            target: "patch",
            start = found.start(),
            end = found.end(),
            replaced_bytes = found.len(),
            rendered_bytes = rendered.len(),
            "marked region located"
        );
        Ok(self
            .region
            .replacen(document, 1, NoExpand(&rendered))
            .into_owned())
    }
}

fn heading_tag(heading: &str) -> String {
    format!("<h3>{heading}</h3>")
}

/// Patch with the default heading.
pub fn patch(document: &str, record: &NewsRecord) -> Result<String, PatchError> {
    DocumentPatcher::new(DEFAULT_HEADING)?.patch(document, record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(summary: &str, url: &str) -> NewsRecord {
        NewsRecord {
            title: "T".into(),
            summary: summary.into(),
            url: url.into(),
            publication_date: None,
            verified_current_month: None,
        }
    }

    #[test]
    fn dollar_signs_in_summary_are_literal() {
        let doc = "<div><h3>AI News of the month</h3><div><p>old</p></div></div>";
        let out = patch(doc, &rec("Cost fell to $1 per run ($0 idle)", "https://x")).unwrap();
        assert!(out.contains("Cost fell to $1 per run ($0 idle)"));
    }

    #[test]
    fn markup_in_record_is_escaped() {
        let doc = "<div><h3>AI News of the month</h3><div><p>old</p></div></div>";
        let out = patch(doc, &rec("a </div></div> b", "https://x/?q=\"y\"")).unwrap();
        assert!(out.contains("a &lt;/div&gt;&lt;/div&gt; b"));
        assert!(out.contains(r#"href="https://x/?q=&"#));
        assert!(!out.contains(r#"q="y""#));
    }

    #[test]
    fn heading_without_closing_pair_is_unterminated() {
        let doc = "<h3>AI News of the month</h3><p>dangling";
        let err = patch(doc, &rec("S", "https://x")).unwrap_err();
        assert!(matches!(err, PatchError::UnterminatedRegion(_)));
    }

    #[test]
    fn custom_heading_is_matched_literally() {
        let p = DocumentPatcher::new("News (beta) + more").unwrap();
        let doc = "<div><h3>News (beta) + more</h3><div>x</div></div>";
        let out = p.patch(doc, &rec("S", "https://x")).unwrap();
        assert!(out.starts_with("<div><h3>News (beta) + more</h3>"));
        assert!(!out.contains(">x<"));
    }
}
