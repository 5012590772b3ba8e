//! Subscription variants: space-scoped and page-scoped.
//!
//! Both variants share [`BaseSubscription`] and differ only in the
//! discriminator that picks the target inside a site. The variant is selected
//! on the wire by the `subscriptionType` field; unknown tags fail to decode.

use serde::{Deserialize, Serialize};

use crate::codec::null_as_default;
use crate::defaults::{ALIAS_ALREADY_EXIST, URL_PAGE_ID_ALREADY_EXIST, URL_SPACE_KEY_ALREADY_EXIST};
use crate::error::{Error, Result};
use crate::events::event_display_name;
use crate::keys::{url_page_id_combination_key, url_space_key_combination_key};
use crate::registry::{InsensitiveLookup, Subscriptions};

/// Variant tag for [`SpaceSubscription`].
pub const SUBSCRIPTION_TYPE_SPACE: &str = "space_subscription";

/// Variant tag for [`PageSubscription`].
pub const SUBSCRIPTION_TYPE_PAGE: &str = "page_subscription";

/// Attributes common to every subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSubscription {
    #[serde(default)]
    pub alias: String,
    /// Alias the subscription had before an in-flight edit.
    #[serde(rename = "oldAlias", default, skip_serializing_if = "Option::is_none")]
    pub old_alias: Option<String>,
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<String>,
    #[serde(rename = "channelID", default)]
    pub channel_id: String,
}

impl BaseSubscription {
    fn validate(&self) -> Result<()> {
        if self.alias.is_empty() {
            return Err(Error::InvalidInput(
                "subscription name can not be empty".to_string(),
            ));
        }
        if self.base_url.is_empty() {
            return Err(Error::InvalidInput("base url can not be empty".to_string()));
        }
        let has_host = url::Url::parse(&self.base_url)
            .map(|u| u.host_str().is_some_and(|h| !h.is_empty()))
            .unwrap_or(false);
        if !has_host {
            return Err(Error::InvalidInput("enter a valid url".to_string()));
        }
        Ok(())
    }

    /// The alias that currently identifies the stored record.
    pub fn identity_alias(&self) -> &str {
        match self.old_alias.as_deref() {
            Some(old) if !old.is_empty() => old,
            _ => &self.alias,
        }
    }
}

/// Subscription to every page in one space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSubscription {
    #[serde(rename = "spaceKey", default)]
    pub space_key: String,
    #[serde(flatten)]
    pub base: BaseSubscription,
}

/// Subscription to a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSubscription {
    #[serde(rename = "pageID", default)]
    pub page_id: String,
    #[serde(flatten)]
    pub base: BaseSubscription,
}

/// Which secondary index a subscription lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Space,
    Page,
}

impl IndexKind {
    /// Field name of the index in the persisted document.
    pub fn field_name(self) -> &'static str {
        match self {
            IndexKind::Space => "ByURLSpaceKey",
            IndexKind::Page => "ByURLPageID",
        }
    }
}

/// A channel subscription of either variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "subscriptionType")]
pub enum Subscription {
    #[serde(rename = "space_subscription")]
    Space(SpaceSubscription),
    #[serde(rename = "page_subscription")]
    Page(PageSubscription),
}

impl From<SpaceSubscription> for Subscription {
    fn from(s: SpaceSubscription) -> Self {
        Subscription::Space(s)
    }
}

impl From<PageSubscription> for Subscription {
    fn from(s: PageSubscription) -> Self {
        Subscription::Page(s)
    }
}

impl Subscription {
    /// Decode a request body for the variant named by `subscription_type`.
    ///
    /// The body must carry the same `subscriptionType` and a non-empty
    /// discriminator.
    pub fn from_request_json(body: &[u8], subscription_type: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| Error::InvalidInput("error unmarshalling data".to_string()))?;

        let body_type = value
            .get("subscriptionType")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        let subscription = match subscription_type {
            SUBSCRIPTION_TYPE_SPACE | SUBSCRIPTION_TYPE_PAGE => {
                serde_json::from_value::<Subscription>(value.clone())
                    .or_else(|_| Self::decode_untagged(value, subscription_type))?
            }
            other => {
                return Err(Error::InvalidInput(format!(
                    "invalid subscription type: {}",
                    other
                )))
            }
        };

        if subscription.discriminator().is_empty() {
            return Err(Error::InvalidInput(match subscription.kind() {
                IndexKind::Space => "spaceKey is required".to_string(),
                IndexKind::Page => "pageID is required".to_string(),
            }));
        }
        if body_type != subscription_type || subscription.name() != subscription_type {
            return Err(Error::InvalidInput(
                "subscription type mismatch".to_string(),
            ));
        }
        Ok(subscription)
    }

    // Bodies with a missing or foreign tag still decode so the caller gets a
    // precise error instead of a generic unmarshalling failure.
    fn decode_untagged(value: serde_json::Value, subscription_type: &str) -> Result<Self> {
        let decoded = if subscription_type == SUBSCRIPTION_TYPE_SPACE {
            serde_json::from_value::<SpaceSubscription>(value).map(Subscription::Space)
        } else {
            serde_json::from_value::<PageSubscription>(value).map(Subscription::Page)
        };
        decoded.map_err(|_| Error::InvalidInput("error unmarshalling data".to_string()))
    }

    /// Variant tag, also used as the table header selector.
    pub fn name(&self) -> &'static str {
        match self {
            Subscription::Space(_) => SUBSCRIPTION_TYPE_SPACE,
            Subscription::Page(_) => SUBSCRIPTION_TYPE_PAGE,
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Subscription::Space(_) => IndexKind::Space,
            Subscription::Page(_) => IndexKind::Page,
        }
    }

    pub fn base(&self) -> &BaseSubscription {
        match self {
            Subscription::Space(s) => &s.base,
            Subscription::Page(p) => &p.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseSubscription {
        match self {
            Subscription::Space(s) => &mut s.base,
            Subscription::Page(p) => &mut p.base,
        }
    }

    pub fn alias(&self) -> &str {
        &self.base().alias
    }

    pub fn channel_id(&self) -> &str {
        &self.base().channel_id
    }

    pub fn events(&self) -> &[String] {
        &self.base().events
    }

    /// Space key or page id.
    pub fn discriminator(&self) -> &str {
        match self {
            Subscription::Space(s) => &s.space_key,
            Subscription::Page(p) => &p.page_id,
        }
    }

    /// Composite key into this variant's secondary index.
    pub fn index_key(&self) -> String {
        match self {
            Subscription::Space(s) => url_space_key_combination_key(&s.base.base_url, &s.space_key),
            Subscription::Page(p) => url_page_id_combination_key(&p.base.base_url, &p.page_id),
        }
    }

    /// Field-level validation, independent of any registry state.
    pub fn validate(&self) -> Result<()> {
        self.base().validate()?;
        if self.discriminator().is_empty() {
            return Err(Error::InvalidInput(match self.kind() {
                IndexKind::Space => "space key can not be empty".to_string(),
                IndexKind::Page => "page id can not be empty".to_string(),
            }));
        }
        if self.channel_id().is_empty() {
            return Err(Error::InvalidInput(
                "channel id can not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and check uniqueness against `snapshot`.
    ///
    /// The snapshot may be stale by the time a write lands, so
    /// [`Subscriptions::add`] repeats the uniqueness checks.
    pub fn validate_subscription(&self, snapshot: &Subscriptions) -> Result<()> {
        self.validate()?;
        self.check_available(snapshot)
    }

    pub(crate) fn check_available(&self, subs: &Subscriptions) -> Result<()> {
        if let Some(channel) = subs.by_channel_id.get(self.channel_id()) {
            if channel.get_insensitive_case(self.alias()).is_some() {
                return Err(Error::Conflict(ALIAS_ALREADY_EXIST.to_string()));
            }
        }
        let taken = subs
            .index(self.kind())
            .get(&self.index_key())
            .is_some_and(|channels| channels.contains_key(self.channel_id()));
        if taken {
            return Err(Error::Conflict(
                match self.kind() {
                    IndexKind::Space => URL_SPACE_KEY_ALREADY_EXIST,
                    IndexKind::Page => URL_PAGE_ID_ALREADY_EXIST,
                }
                .to_string(),
            ));
        }
        Ok(())
    }

    /// One markdown table row: alias, base URL, discriminator, event names.
    pub fn formatted_row(&self) -> String {
        let events: Vec<&str> = self
            .events()
            .iter()
            .map(|e| event_display_name(e))
            .collect();
        format!(
            "\n|{}|{}|{}|{}|",
            self.alias(),
            self.base().base_url,
            self.discriminator(),
            events.join(", ")
        )
    }

    pub fn add(&self, subs: &mut Subscriptions) -> Result<()> {
        subs.add(self.clone())
    }

    pub fn remove(&self, subs: &mut Subscriptions) -> Result<()> {
        subs.remove(self).map(|_| ())
    }

    pub fn edit(&self, subs: &mut Subscriptions) -> Result<()> {
        subs.edit(self.clone())
    }
}
