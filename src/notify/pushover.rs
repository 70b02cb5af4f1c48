use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Notification, NotificationError, NotifySink};

pub const DEFAULT_PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

/// Pushover message API. One POST per notification, bounded by `timeout`, no retries.
#[derive(Clone)]
pub struct PushoverSink {
    url: String,
    token: String,
    user: String,
    client: Client,
    timeout: Duration,
}

impl PushoverSink {
    pub fn new(url: impl Into<String>, token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            user: user.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct PushoverForm<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
    priority: i8,
    timestamp: i64,
}

#[async_trait::async_trait]
impl NotifySink for PushoverSink {
    async fn deliver(&self, n: &Notification) -> Result<(), NotificationError> {
        let form = PushoverForm {
            token: &self.token,
            user: &self.user,
            title: &n.title,
            message: &n.message,
            priority: n.priority,
            timestamp: n.timestamp,
        };

        let rsp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout
                } else {
                    NotificationError::Transport(e)
                }
            })?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(NotificationError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pushover"
    }
}
