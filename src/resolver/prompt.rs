// src/resolver/prompt.rs
use chrono::NaiveDate;

/// Instruction sent to the search provider, plus the date labels it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPrompt {
    /// e.g. "October 19, 2026"
    pub date_label: String,
    /// e.g. "October 2026"
    pub month_label: String,
    pub text: String,
}

impl SearchPrompt {
    pub fn for_date(today: NaiveDate, preferred_sources: &[String]) -> Self {
        let date_label = today.format("%B %d, %Y").to_string();
        let month_label = today.format("%B %Y").to_string();
        let sources = if preferred_sources.is_empty() {
            "reputable scientific publications".to_string()
        } else {
            preferred_sources.join(", ")
        };
        let text = render(&date_label, &month_label, &sources);
        Self {
            date_label,
            month_label,
            text,
        }
    }
}

fn render(date: &str, month: &str, sources: &str) -> String {
    format!(
        r#"Today is {date}.

CRITICAL: You MUST find AI news published in {month}. Do NOT select news from earlier months.

Search the web for the most recent and significant AI research breakthrough or development published in {month}.

Search Strategy:
1. Search for: "AI breakthrough {month}" OR "AI research {month}" OR "artificial intelligence discovery {month}"
2. Focus on these sources: {sources}
3. Filter publication dates - ONLY {month}

Requirements:
- MUST be from {month} (verify publication date)
- Academic/research focus (NOT business, startups, funding, stocks)
- From reputable scientific sources
- Significant development (even if incremental - ANY research from this month counts)

If you find MULTIPLE items from {month}, select the most significant one.
If you find NO items from {month}, search for "latest AI research" and find the MOST RECENT available, noting the actual date.

Return ONLY valid JSON (no markdown, no formatting):

{{
    "title": "exact headline",
    "summary": "one sentence: [specific breakthrough] enabling [impact]",
    "url": "full source URL",
    "publication_date": "exact date found",
    "verified_current_month": true/false
}}

Example summary: "Researchers achieved 99.2% accuracy in real-time translation across 200 languages using a new transformer architecture, enabling instant cross-language communication"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_the_given_day() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let p = SearchPrompt::for_date(day, &["Nature".to_string(), "arXiv".to_string()]);
        assert_eq!(p.month_label, "October 2026");
        assert_eq!(p.date_label, "October 19, 2026");
        assert!(p.text.starts_with("Today is October 19, 2026."));
        assert!(p.text.contains("Focus on these sources: Nature, arXiv"));
        assert!(p.text.contains("NOT business, startups, funding, stocks"));
        assert!(p.text.contains("\"verified_current_month\""));
    }

    #[test]
    fn empty_source_list_falls_back_to_generic_wording() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let p = SearchPrompt::for_date(day, &[]);
        assert!(p.text.contains("reputable scientific publications"));
        assert_eq!(p.month_label, "January 2026");
    }
}
