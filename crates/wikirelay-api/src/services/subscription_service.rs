//! Subscription management and channel resolution.
//!
//! Wraps the registry repository with request validation and maps registry
//! errors onto the user-facing messages and statuses of the HTTP layer.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, instrument};

use wikirelay_core::defaults::{
    general_delete_error, subscription_not_found, GENERAL_ERROR, GENERAL_SAVE_ERROR,
};
use wikirelay_core::{
    validate_events_for_server_version, ChannelSubscriptions, Error, EventTarget, InsensitiveLookup,
    Subscription, SubscriptionRepository,
};

use crate::error::ApiError;

#[derive(Clone)]
pub struct SubscriptionService {
    repo: Arc<dyn SubscriptionRepository>,
    server_v9_or_above: bool,
}

/// Validation and conflicts keep their message; anything else becomes
/// `public` after being logged.
fn map_write_error(err: Error, public: &str) -> ApiError {
    match err {
        Error::InvalidInput(msg) | Error::Conflict(msg) => ApiError::BadRequest(msg),
        other => ApiError::internal(&other, public),
    }
}

impl SubscriptionService {
    pub fn new(repo: Arc<dyn SubscriptionRepository>, server_v9_or_above: bool) -> Self {
        Self {
            repo,
            server_v9_or_above,
        }
    }

    fn validate_request(&self, sub: &Subscription) -> Result<(), ApiError> {
        sub.validate()?;
        validate_events_for_server_version(sub.events(), self.server_v9_or_above)?;
        Ok(())
    }

    /// Validate `sub` and add it to the registry.
    ///
    /// The pre-flight uniqueness check runs against a snapshot; the add
    /// repeats it inside the atomic update, so a racing save is still
    /// rejected as a conflict.
    #[instrument(skip_all, fields(subsystem = "api", op = "save", channel_id = %sub.channel_id(), alias = %sub.alias()))]
    pub async fn save_subscription(&self, sub: Subscription) -> Result<(), ApiError> {
        self.validate_request(&sub)?;
        let snapshot = self
            .repo
            .get_subscriptions()
            .await
            .map_err(|e| ApiError::internal(&e, GENERAL_SAVE_ERROR))?;
        sub.validate_subscription(&snapshot)
            .map_err(|e| map_write_error(e, GENERAL_SAVE_ERROR))?;

        self.repo
            .modify(&|subs| sub.add(subs))
            .await
            .map_err(|e| map_write_error(e, GENERAL_SAVE_ERROR))?;

        info!(subscription_type = sub.name(), "Subscription saved");
        Ok(())
    }

    /// Replace the subscription stored under `sub`'s old alias (or its
    /// alias, when unchanged) with `sub`.
    #[instrument(skip_all, fields(subsystem = "api", op = "edit", channel_id = %sub.channel_id(), alias = %sub.alias()))]
    pub async fn edit_subscription(&self, sub: Subscription) -> Result<(), ApiError> {
        self.validate_request(&sub)?;
        let identity = sub.base().identity_alias().to_string();

        self.repo.modify(&|subs| sub.edit(subs)).await.map_err(|e| match e {
            Error::NotFound(_) => ApiError::NotFound(subscription_not_found(&identity)),
            err @ Error::EditPartiallyFailed(_) => {
                let msg = err.to_string();
                ApiError::internal(&err, msg)
            }
            other => map_write_error(other, GENERAL_SAVE_ERROR),
        })?;

        info!(previous_alias = %identity, "Subscription edited");
        Ok(())
    }

    /// Delete a channel's subscription by alias, matched case-insensitively.
    #[instrument(skip(self), fields(subsystem = "api", op = "delete"))]
    pub async fn delete_subscription(&self, channel_id: &str, alias: &str) -> Result<(), ApiError> {
        let channel = self
            .repo
            .get_subscriptions_by_channel_id(channel_id)
            .await
            .map_err(|e| ApiError::internal(&e, general_delete_error(alias)))?;
        let stored = channel
            .get_insensitive_case(alias)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(subscription_not_found(alias)))?;

        self.repo
            .modify(&|subs| stored.remove(subs))
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => ApiError::NotFound(subscription_not_found(alias)),
                other => ApiError::internal(&other, general_delete_error(alias)),
            })?;

        info!(stored_alias = %stored.alias(), "Subscription deleted");
        Ok(())
    }

    /// One subscription of a channel, matched case-insensitively.
    pub async fn get_channel_subscription(
        &self,
        channel_id: &str,
        alias: &str,
    ) -> Result<Subscription, ApiError> {
        self.get_subscriptions_by_channel_id(channel_id)
            .await?
            .get_insensitive_case(alias)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(subscription_not_found(alias)))
    }

    /// All subscriptions of a channel keyed by alias; empty if it has none.
    pub async fn get_subscriptions_by_channel_id(
        &self,
        channel_id: &str,
    ) -> Result<ChannelSubscriptions, ApiError> {
        self.repo
            .get_subscriptions_by_channel_id(channel_id)
            .await
            .map_err(|e| ApiError::internal(&e, GENERAL_ERROR))
    }

    /// Aliases of a channel's subscriptions, sorted.
    pub async fn autocomplete_aliases(&self, channel_id: &str) -> Result<Vec<String>, ApiError> {
        Ok(self
            .get_subscriptions_by_channel_id(channel_id)
            .await?
            .into_keys()
            .collect())
    }

    /// Channels that should receive an event at `target`.
    pub async fn resolve_notification_channels(
        &self,
        target: EventTarget<'_>,
    ) -> Result<BTreeSet<String>, ApiError> {
        let subs = self
            .repo
            .get_subscriptions()
            .await
            .map_err(|e| ApiError::internal(&e, GENERAL_ERROR))?;
        Ok(subs.resolve_notification_channels(target))
    }
}
