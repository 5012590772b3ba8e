//! Inbound wiki events to chat messages.
//!
//! An event is turned into one markdown message, the registry decides which
//! channels receive it, and a [`Notifier`] delivers it to each of them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wikirelay_core::defaults::NOTIFY_TIMEOUT_SECS;
use wikirelay_core::events::{
    COMMENT_CREATED, COMMENT_REMOVED, COMMENT_UPDATED, PAGE_CREATED, PAGE_REMOVED, PAGE_RESTORED,
    PAGE_TRASHED, PAGE_UPDATED,
};
use wikirelay_core::{Error, EventTarget, Result};

use crate::error::ApiError;
use crate::services::SubscriptionService;

/// Event posted by the wiki.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiEvent {
    /// Event id, e.g. `page_created`.
    #[serde(rename = "event")]
    pub event_type: String,
    /// Site base URL; the configured wiki URL is used when empty.
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(rename = "spaceKey")]
    pub space_key: String,
    #[serde(rename = "pageID")]
    pub page_id: String,
    /// Page title.
    pub title: String,
    /// Link to the page, or to the comment for comment events.
    pub url: String,
    /// Title of the commented page.
    #[serde(rename = "parentTitle")]
    pub parent_title: String,
    #[serde(rename = "parentURL")]
    pub parent_url: String,
}

impl WikiEvent {
    /// Chat message for this event, or `None` for events that are not
    /// announced.
    pub fn message(&self) -> Option<String> {
        let message = match self.event_type.as_str() {
            PAGE_CREATED => format!(
                "A new page [{}]({}) was created in the **{}** space.",
                self.title, self.url, self.space_key
            ),
            PAGE_UPDATED => format!(
                "Page [{}]({}) was updated in the **{}** space.",
                self.title, self.url, self.space_key
            ),
            PAGE_TRASHED => format!(
                "Page [{}]({}) was moved to the trash in the **{}** space.",
                self.title, self.url, self.space_key
            ),
            PAGE_RESTORED => format!(
                "Page [{}]({}) was restored in the **{}** space.",
                self.title, self.url, self.space_key
            ),
            PAGE_REMOVED => format!(
                "Page **{}** was removed from the **{}** space.",
                self.title, self.space_key
            ),
            COMMENT_CREATED => format!(
                "A new [Comment]({}) was posted on the [{}]({}) page.",
                self.url, self.parent_title, self.parent_url
            ),
            COMMENT_UPDATED => format!(
                "A [Comment]({}) was updated on the [{}]({}) page.",
                self.url, self.parent_title, self.parent_url
            ),
            COMMENT_REMOVED => format!(
                "A Comment was deleted from the [{}]({}) page.",
                self.parent_title, self.parent_url
            ),
            _ => return None,
        };
        Some(message)
    }
}

/// Delivers a message to one chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: &str, message: &str) -> Result<()>;
}

/// Posts `{"channel_id", "text"}` to a chat webhook.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, channel_id: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "channel_id": channel_id,
                "text": message,
            }))
            .send()
            .await
            .map_err(|e| Error::Store(format!("notification delivery failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Store(format!(
                "notification webhook returned {}",
                status
            )));
        }
        Ok(())
    }
}

/// Logs messages instead of delivering them. Used when no webhook is
/// configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, channel_id: &str, message: &str) -> Result<()> {
        info!(subsystem = "notify", channel_id, message, "Notification (not delivered)");
        Ok(())
    }
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Channels the event resolved to.
    pub channels: Vec<String>,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    service: SubscriptionService,
    notifier: Arc<dyn Notifier>,
    wiki_url: String,
}

impl NotificationDispatcher {
    pub fn new(service: SubscriptionService, notifier: Arc<dyn Notifier>, wiki_url: String) -> Self {
        Self {
            service,
            notifier,
            wiki_url,
        }
    }

    /// Resolve the channels for `event` and notify each one.
    ///
    /// Delivery failures are logged and counted; they do not stop delivery
    /// to the remaining channels.
    pub async fn dispatch(&self, event: &WikiEvent) -> std::result::Result<DispatchReport, ApiError> {
        let Some(message) = event.message() else {
            debug!(
                subsystem = "notify",
                event_type = %event.event_type,
                "Event not announced"
            );
            return Ok(DispatchReport::default());
        };

        let base_url = if event.base_url.is_empty() {
            self.wiki_url.as_str()
        } else {
            event.base_url.as_str()
        };
        let channels = self
            .service
            .resolve_notification_channels(EventTarget {
                base_url,
                space_key: &event.space_key,
                page_id: &event.page_id,
                event_type: &event.event_type,
            })
            .await?;

        let deliveries = channels.iter().map(|channel_id| {
            let message = message.as_str();
            async move {
                let result = self.notifier.notify(channel_id, message).await;
                if let Err(e) = &result {
                    warn!(
                        subsystem = "notify",
                        channel_id = %channel_id,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
                result.is_ok()
            }
        });
        let results = join_all(deliveries).await;
        let delivered = results.iter().filter(|ok| **ok).count();

        info!(
            subsystem = "notify",
            event_type = %event.event_type,
            result_count = channels.len(),
            delivered,
            "Event dispatched"
        );
        Ok(DispatchReport {
            failed: results.len() - delivered,
            delivered,
            channels: channels.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str) -> WikiEvent {
        WikiEvent {
            event_type: event_type.to_string(),
            base_url: "https://wiki.example.com".to_string(),
            space_key: "ENG".to_string(),
            page_id: "42".to_string(),
            title: "Roadmap".to_string(),
            url: "https://wiki.example.com/x/42".to_string(),
            parent_title: "Roadmap".to_string(),
            parent_url: "https://wiki.example.com/x/42".to_string(),
        }
    }

    #[test]
    fn test_page_messages() {
        assert_eq!(
            event("page_created").message().unwrap(),
            "A new page [Roadmap](https://wiki.example.com/x/42) was created in the **ENG** space."
        );
        assert_eq!(
            event("page_removed").message().unwrap(),
            "Page **Roadmap** was removed from the **ENG** space."
        );
    }

    #[test]
    fn test_comment_messages() {
        let mut e = event("comment_created");
        e.url = "https://wiki.example.com/x/42#c1".to_string();
        assert_eq!(
            e.message().unwrap(),
            "A new [Comment](https://wiki.example.com/x/42#c1) was posted on the [Roadmap](https://wiki.example.com/x/42) page."
        );
        assert_eq!(
            event("comment_removed").message().unwrap(),
            "A Comment was deleted from the [Roadmap](https://wiki.example.com/x/42) page."
        );
    }

    #[test]
    fn test_unknown_event_has_no_message() {
        assert!(event("space_updated").message().is_none());
        assert!(event("").message().is_none());
    }

    #[test]
    fn test_decode_payload() {
        let e: WikiEvent = serde_json::from_str(
            r#"{"event":"page_updated","baseURL":"https://w","spaceKey":"ENG","title":"T"}"#,
        )
        .unwrap();
        assert_eq!(e.event_type, "page_updated");
        assert_eq!(e.page_id, "");
        assert_eq!(e.title, "T");
    }
}
