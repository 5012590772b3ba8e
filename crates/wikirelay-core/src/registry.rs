//! The subscription registry and its derived indices.
//!
//! `ByChannelID` is the primary map. `ByURLPageID` and `ByURLSpaceKey` are
//! derived from it and every mutation here updates all three together.
//! Each mutation works on a full in-memory copy; persistence and concurrency
//! are handled by the store's atomic update loop, which discards the copy
//! when a mutation fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::{index_map, primary_map};
use crate::error::{Error, Result};
use crate::subscription::{IndexKind, Subscription, SUBSCRIPTION_TYPE_PAGE, SUBSCRIPTION_TYPE_SPACE};

/// alias → subscription, for one channel.
pub type ChannelSubscriptions = BTreeMap<String, Subscription>;

/// channel id → subscribed events, for one composite key.
pub type ChannelEvents = BTreeMap<String, Vec<String>>;

/// Case-insensitive alias lookup.
pub trait InsensitiveLookup {
    fn get_insensitive_case(&self, alias: &str) -> Option<&Subscription>;

    /// The stored key matching `alias`, preferring an exact match.
    fn find_alias_key(&self, alias: &str) -> Option<String>;
}

impl InsensitiveLookup for ChannelSubscriptions {
    fn get_insensitive_case(&self, alias: &str) -> Option<&Subscription> {
        self.find_alias_key(alias).and_then(|k| self.get(&k))
    }

    fn find_alias_key(&self, alias: &str) -> Option<String> {
        if self.contains_key(alias) {
            return Some(alias.to_string());
        }
        let wanted = alias.to_lowercase();
        self.keys().find(|k| k.to_lowercase() == wanted).cloned()
    }
}

/// Root aggregate, persisted as one blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriptions {
    #[serde(rename = "ByChannelID", default, deserialize_with = "primary_map")]
    pub by_channel_id: BTreeMap<String, ChannelSubscriptions>,
    #[serde(rename = "ByURLPageID", default, deserialize_with = "index_map")]
    pub by_url_page_id: BTreeMap<String, ChannelEvents>,
    #[serde(rename = "ByURLSpaceKey", default, deserialize_with = "index_map")]
    pub by_url_space_key: BTreeMap<String, ChannelEvents>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a freshly decoded registry. Idempotent.
    ///
    /// Drops channels with no subscriptions, clears edit-only `oldAlias`
    /// values left by older writers, and rebuilds both indices from
    /// `ByChannelID` with the current key derivation.
    pub fn ensure_defaults(&mut self) {
        self.by_channel_id.retain(|_, subs| !subs.is_empty());
        for sub in self.by_channel_id.values_mut().flat_map(|s| s.values_mut()) {
            sub.base_mut().old_alias = None;
        }
        self.rebuild_indices();
    }

    // Older writers kept the host's original case in composite keys, so
    // stored keys can differ from what `index_key` derives today.
    fn rebuild_indices(&mut self) {
        let mut by_url_page_id: BTreeMap<String, ChannelEvents> = BTreeMap::new();
        let mut by_url_space_key: BTreeMap<String, ChannelEvents> = BTreeMap::new();
        for (channel_id, subs) in &self.by_channel_id {
            for sub in subs.values() {
                let index = match sub.kind() {
                    IndexKind::Space => &mut by_url_space_key,
                    IndexKind::Page => &mut by_url_page_id,
                };
                index
                    .entry(sub.index_key())
                    .or_default()
                    .insert(channel_id.clone(), sub.events().to_vec());
            }
        }

        if by_url_page_id != self.by_url_page_id || by_url_space_key != self.by_url_space_key {
            debug!(
                subsystem = "registry",
                op = "load",
                stored_keys = self.by_url_page_id.len() + self.by_url_space_key.len(),
                rebuilt_keys = by_url_page_id.len() + by_url_space_key.len(),
                "Rebuilt indices from ByChannelID"
            );
        }
        self.by_url_page_id = by_url_page_id;
        self.by_url_space_key = by_url_space_key;
    }

    pub fn index(&self, kind: IndexKind) -> &BTreeMap<String, ChannelEvents> {
        match kind {
            IndexKind::Space => &self.by_url_space_key,
            IndexKind::Page => &self.by_url_page_id,
        }
    }

    fn index_mut(&mut self, kind: IndexKind) -> &mut BTreeMap<String, ChannelEvents> {
        match kind {
            IndexKind::Space => &mut self.by_url_space_key,
            IndexKind::Page => &mut self.by_url_page_id,
        }
    }

    /// Subscriptions for one channel, if it has any.
    pub fn channel(&self, channel_id: &str) -> Option<&ChannelSubscriptions> {
        self.by_channel_id.get(channel_id)
    }

    /// Insert a subscription into the primary map and its index.
    ///
    /// Alias and site+discriminator uniqueness are re-checked against this
    /// registry, so a stale pre-flight check cannot produce duplicates.
    pub fn add(&mut self, mut sub: Subscription) -> Result<()> {
        sub.check_available(self)?;
        sub.base_mut().old_alias = None;

        let channel_id = sub.channel_id().to_string();
        let alias = sub.alias().to_string();
        let key = sub.index_key();
        let events = sub.events().to_vec();
        let kind = sub.kind();

        self.by_channel_id
            .entry(channel_id.clone())
            .or_default()
            .insert(alias, sub);
        self.index_mut(kind)
            .entry(key)
            .or_default()
            .insert(channel_id, events);
        Ok(())
    }

    /// Remove the stored subscription identified by `sub`'s channel and its
    /// pre-edit alias (falling back to the current alias).
    ///
    /// The index entry is derived from the stored record, not from `sub`, so
    /// an edit that changes the site or discriminator still removes the right
    /// entry. Nothing is mutated unless every entry is present.
    pub fn remove(&mut self, sub: &Subscription) -> Result<Subscription> {
        let channel_id = sub.channel_id();
        let alias = sub.base().identity_alias();

        let channel = self
            .by_channel_id
            .get(channel_id)
            .ok_or_else(|| Error::NotFound("channelID not found in ByChannelID".to_string()))?;
        let stored_alias = channel
            .find_alias_key(alias)
            .ok_or_else(|| Error::NotFound("alias not found in ByChannelID".to_string()))?;
        let stored = &channel[&stored_alias];
        let kind = stored.kind();
        let key = stored.index_key();

        let bucket = self.index(kind).get(&key).ok_or_else(|| {
            Error::NotFound(format!("key not found in {}", kind.field_name()))
        })?;
        if !bucket.contains_key(channel_id) {
            return Err(Error::NotFound(format!(
                "channelID not found in {} entry",
                kind.field_name()
            )));
        }

        let mut removed = None;
        if let Some(channel) = self.by_channel_id.get_mut(channel_id) {
            removed = channel.remove(&stored_alias);
            if channel.is_empty() {
                self.by_channel_id.remove(channel_id);
            }
        }
        let index = self.index_mut(kind);
        if let Some(bucket) = index.get_mut(&key) {
            bucket.remove(channel_id);
            if bucket.is_empty() {
                index.remove(&key);
            }
        }
        removed.ok_or_else(|| Error::InvariantViolation("subscription vanished during remove".to_string()))
    }

    /// Replace the subscription stored under `sub`'s old alias with `sub`.
    ///
    /// Runs remove then add. If the add fails, the original record is
    /// re-added and the add error is returned with the registry unchanged;
    /// if that restore also fails the result is
    /// [`Error::EditPartiallyFailed`] and the subscription is gone.
    pub fn edit(&mut self, sub: Subscription) -> Result<()> {
        let original = self.remove(&sub)?;
        let Err(add_err) = self.add(sub) else {
            return Ok(());
        };

        warn!(
            subsystem = "registry",
            op = "edit",
            channel_id = %original.channel_id(),
            alias = %original.alias(),
            error = %add_err,
            "Edit rejected, restoring original subscription"
        );
        match self.add(original) {
            Ok(()) => Err(add_err),
            Err(restore_err) => Err(Error::EditPartiallyFailed(format!(
                "{}; restore failed: {}",
                add_err, restore_err
            ))),
        }
    }

    /// Check that the derived indices agree with the primary map in both
    /// directions.
    pub fn verify_indices(&self) -> Result<()> {
        let mut expected: usize = 0;
        for (channel_id, subs) in &self.by_channel_id {
            for (alias, sub) in subs {
                if sub.channel_id() != channel_id || sub.alias() != alias {
                    return Err(Error::InvariantViolation(format!(
                        "subscription stored under {}/{} identifies as {}/{}",
                        channel_id,
                        alias,
                        sub.channel_id(),
                        sub.alias()
                    )));
                }
                let indexed = self
                    .index(sub.kind())
                    .get(&sub.index_key())
                    .and_then(|channels| channels.get(channel_id));
                if indexed.map(Vec::as_slice) != Some(sub.events()) {
                    return Err(Error::InvariantViolation(format!(
                        "{} has no matching entry for {}/{}",
                        sub.kind().field_name(),
                        channel_id,
                        alias
                    )));
                }
                expected += 1;
            }
        }

        let indexed: usize = self
            .by_url_page_id
            .values()
            .chain(self.by_url_space_key.values())
            .map(|channels| channels.len())
            .sum();
        if indexed != expected {
            return Err(Error::InvariantViolation(format!(
                "indices hold {} entries but ByChannelID holds {} subscriptions",
                indexed, expected
            )));
        }
        Ok(())
    }
}

/// Render a channel's subscriptions as markdown tables, spaces first.
pub fn formatted_subscription_list(channel: &ChannelSubscriptions) -> String {
    let mut page_rows = String::new();
    let mut space_rows = String::new();
    for sub in channel.values() {
        match sub.name() {
            SUBSCRIPTION_TYPE_PAGE => page_rows.push_str(&sub.formatted_row()),
            SUBSCRIPTION_TYPE_SPACE => space_rows.push_str(&sub.formatted_row()),
            _ => {}
        }
    }

    let mut list = String::new();
    if !space_rows.is_empty() {
        list.push_str("#### Space Subscriptions \n");
        list.push_str("| Name | Base Url | Space Key | Events|\n| :----|:--------| :--------| :-----|");
        list.push_str(&space_rows);
    }
    if !space_rows.is_empty() && !page_rows.is_empty() {
        list.push_str("\n\n");
    }
    if !page_rows.is_empty() {
        list.push_str("#### Page Subscriptions \n");
        list.push_str("| Name | Base Url | Page Id | Events|\n| :----|:--------| :--------| :-----|");
        list.push_str(&page_rows);
    }
    list
}
