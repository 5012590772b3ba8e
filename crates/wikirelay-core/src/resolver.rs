//! Notification fan-out: which channels receive an inbound event.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::keys::{url_page_id_combination_key, url_space_key_combination_key};
use crate::registry::{ChannelEvents, Subscriptions};

/// Site, target, and type of an inbound wiki event.
#[derive(Debug, Clone, Copy)]
pub struct EventTarget<'a> {
    pub base_url: &'a str,
    /// Empty when the event is page-scoped only.
    pub space_key: &'a str,
    /// Empty when the event is space-scoped only.
    pub page_id: &'a str,
    pub event_type: &'a str,
}

fn collect_subscribed(channels: Option<&ChannelEvents>, event_type: &str, out: &mut BTreeSet<String>) {
    let Some(channels) = channels else {
        return;
    };
    for (channel_id, events) in channels {
        if events.iter().any(|e| e == event_type) {
            trace!(channel_id = %channel_id, event_type, "Channel matched");
            out.insert(channel_id.clone());
        }
    }
}

impl Subscriptions {
    /// Channels subscribed to this event through the space index, the page
    /// index, or both. A channel matched by both is reported once.
    pub fn resolve_notification_channels(&self, target: EventTarget<'_>) -> BTreeSet<String> {
        let mut channels = BTreeSet::new();

        if !target.space_key.is_empty() {
            let key = url_space_key_combination_key(target.base_url, target.space_key);
            collect_subscribed(self.by_url_space_key.get(&key), target.event_type, &mut channels);
        }
        if !target.page_id.is_empty() {
            let key = url_page_id_combination_key(target.base_url, target.page_id);
            collect_subscribed(self.by_url_page_id.get(&key), target.event_type, &mut channels);
        }

        debug!(
            subsystem = "registry",
            component = "resolver",
            event_type = target.event_type,
            result_count = channels.len(),
            "Resolved notification channels"
        );
        channels
    }
}
