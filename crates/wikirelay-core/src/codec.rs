//! JSON codec for the persisted registry blob.
//!
//! The blob is a single JSON document with top-level fields `ByChannelID`,
//! `ByURLPageID`, and `ByURLSpaceKey`. Older writers emitted `null` for empty
//! maps and lists, so every level decodes `null` as empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::registry::{ChannelEvents, ChannelSubscriptions, Subscriptions};
use crate::subscription::Subscription;

/// Deserialize `null` as `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn primary_map<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, ChannelSubscriptions>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<BTreeMap<String, Subscription>>>> =
        Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(channel, subs)| (channel, subs.unwrap_or_default()))
        .collect())
}

pub(crate) fn index_map<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, ChannelEvents>, D::Error>
where
    D: Deserializer<'de>,
{
    type Raw = Option<BTreeMap<String, Option<BTreeMap<String, Option<Vec<String>>>>>>;
    let raw: Raw = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, channels)| {
            let channels = channels
                .unwrap_or_default()
                .into_iter()
                .map(|(channel, events)| (channel, events.unwrap_or_default()))
                .collect();
            (key, channels)
        })
        .collect())
}

impl Subscriptions {
    /// Decode a stored blob. An absent or empty blob yields an empty registry.
    pub fn from_json(bytes: Option<&[u8]>) -> Result<Self> {
        let mut subs = match bytes {
            Some(b) if !b.is_empty() => serde_json::from_slice::<Subscriptions>(b)?,
            _ => Subscriptions::new(),
        };
        subs.ensure_defaults();
        Ok(subs)
    }

    /// Encode for storage. Map keys are emitted in sorted order.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
