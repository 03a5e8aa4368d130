use reqwest::Client;
use tracing::{debug, warn};

use invitation_types::config::SlackConfig;
use invitation_types::models::GuestbookEntry;

/// Posts guestbook activity to a Slack incoming webhook. Best effort: a
/// failed post is logged and otherwise ignored.
#[derive(Clone)]
pub struct SlackNotifier {
    http: Client,
    webhook_url: Option<String>,
    channel: String,
    compact: bool,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>, config: &SlackConfig) -> Self {
        Self {
            http: Client::new(),
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            channel: config.channel.clone(),
            compact: config.compact_message,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, &SlackConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn guestbook_text(&self, entry: &GuestbookEntry) -> String {
        if self.compact {
            format!("📝 {}: {}", entry.name, entry.message)
        } else {
            format!(
                "📝 *New guestbook entry*\n*Name:* {}\n*Message:* {}\n*Time:* {}",
                entry.name,
                entry.message,
                entry.created_at.format("%Y-%m-%d %H:%M UTC")
            )
        }
    }

    fn payload(&self, text: String) -> serde_json::Value {
        let mut payload = serde_json::json!({ "text": text });
        if !self.channel.is_empty() {
            payload["channel"] = self.channel.clone().into();
        }
        payload
    }

    /// Fire-and-forget notification for a new entry.
    pub fn guestbook_entry(&self, entry: &GuestbookEntry) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };
        let payload = self.payload(self.guestbook_text(entry));
        let http = self.http.clone();

        tokio::spawn(async move {
            match http.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => debug!("Slack notified"),
                Ok(resp) => warn!("Slack webhook returned {}", resp.status()),
                Err(e) => warn!("Slack webhook failed: {}", e),
            }
        });
    }
}
