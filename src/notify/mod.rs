// src/notify/mod.rs
//! Outcome notifications. Delivery is best-effort: `Notifier::notify` logs
//! transport failures and never hands an error back to the run.

pub mod pushover;

use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::resolver::NewsRecord;

pub use pushover::PushoverSink;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification request timed out")]
    Timeout,

    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

/// What the run ended with, as far as the recipient cares.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Updated(&'a NewsRecord),
    Preserved { diagnostic: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    /// Pushover range -2..=2.
    pub priority: i8,
    /// Unix seconds.
    pub timestamp: i64,
}

impl Notification {
    pub fn for_outcome(outcome: Outcome<'_>, priority: i8, now: DateTime<Utc>) -> Self {
        let (title, message) = match outcome {
            Outcome::Updated(record) => (
                "✅ Portfolio Updated with AI News".to_string(),
                format!(
                    "Successfully updated your portfolio with:\n\n{}\n\n{}",
                    record.title, record.summary
                ),
            ),
            Outcome::Preserved { diagnostic } => (
                "❌ Portfolio Update Failed".to_string(),
                format!("Error: {diagnostic}. The existing AI news will remain unchanged."),
            ),
        };
        Self {
            title,
            message,
            priority,
            timestamp: now.timestamp(),
        }
    }
}

#[async_trait::async_trait]
pub trait NotifySink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError>;
    fn name(&self) -> &'static str;
}

pub type DynNotifySink = Arc<dyn NotifySink>;

pub struct Notifier {
    sink: DynNotifySink,
    priority: i8,
}

impl Notifier {
    pub fn new(sink: DynNotifySink, priority: i8) -> Self {
        Self { sink, priority }
    }

    /// Send one notification. Returns whether it was delivered.
    pub async fn notify(&self, outcome: Outcome<'_>, now: DateTime<Utc>) -> bool {
        let notification = Notification::for_outcome(outcome, self.priority, now);
        match self.sink.deliver(&notification).await {
            Ok(()) => {
                counter!("news_agent_notifications_total", "result" => "sent").increment(1);
                tracing::info!(
                    target: "notify",
                    sink = self.sink.name(),
                    title = %notification.title,
                    "notification sent"
                );
                true
            }
            Err(e) => {
                counter!("news_agent_notifications_total", "result" => "failed").increment(1);
                tracing::error!(
                    target: "notify",
                    sink = self.sink.name(),
                    error = %e,
                    "error sending notification"
                );
                false
            }
        }
    }
}

/// Logs notifications instead of pushing them (dry runs).
pub struct LogSink;

#[async_trait::async_trait]
impl NotifySink for LogSink {
    async fn deliver(&self, n: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            target: "notify",
            title = %n.title,
            message = %n.message,
            priority = n.priority,
            "notification (log only)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// --- Test helper ---
/// Keeps every notification in memory; can be told to fail.
pub struct MemorySink {
    pub sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotifySink for MemorySink {
    async fn deliver(&self, n: &Notification) -> Result<(), NotificationError> {
        if let Ok(mut v) = self.sent.lock() {
            v.push(n.clone());
        }
        if self.fail {
            return Err(NotificationError::Timeout);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> NewsRecord {
        NewsRecord {
            title: "Chip learns".into(),
            summary: "A chip learned 2x faster, enabling cheaper training.".into(),
            url: "https://example.org/a".into(),
            publication_date: None,
            verified_current_month: Some(true),
        }
    }

    #[test]
    fn success_message_carries_title_and_summary() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        let rec = record();
        let n = Notification::for_outcome(Outcome::Updated(&rec), 0, now);
        assert!(n.title.contains("Updated"));
        assert!(n.message.contains("Chip learns"));
        assert!(n.message.contains("enabling cheaper training"));
        assert_eq!(n.timestamp, now.timestamp());
    }

    #[test]
    fn failure_message_carries_diagnostic_and_preservation_note() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        let n = Notification::for_outcome(
            Outcome::Preserved {
                diagnostic: "search request failed: timed out",
            },
            1,
            now,
        );
        assert!(n.title.contains("Failed"));
        assert!(n.message.contains("timed out"));
        assert!(n.message.contains("remain unchanged"));
        assert_eq!(n.priority, 1);
    }

    #[tokio::test]
    async fn failing_sink_is_swallowed() {
        let sink = Arc::new(MemorySink::failing());
        let notifier = Notifier::new(sink.clone(), 0);
        let rec = record();
        let delivered = notifier.notify(Outcome::Updated(&rec), Utc::now()).await;
        assert!(!delivered);
        assert_eq!(sink.sent().len(), 1);
    }
}
