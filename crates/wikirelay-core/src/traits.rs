//! Core traits for wikirelay abstractions.
//!
//! These traits define the seams that concrete storage backends implement,
//! enabling pluggable key-value stores and in-memory testing.

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::{ChannelSubscriptions, Subscriptions};

/// Registry mutation applied inside an atomic update. May run more than
/// once when a concurrent writer wins the compare-and-set.
pub type RegistryMutation<'a> = &'a (dyn Fn(&mut Subscriptions) -> Result<()> + Send + Sync);

/// Key-value store with compare-and-set.
///
/// `None` means the key is absent, which is distinct from a present key
/// holding an empty value.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Unconditionally write a value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Write `new` only if the stored value still equals `expected`
    /// (`None` = key must be absent). Returns `Ok(false)` on a conflict;
    /// `Err` is reserved for transport or storage failures.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool>;
}

/// Access to the persisted subscription registry.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Load the current snapshot.
    async fn get_subscriptions(&self) -> Result<Subscriptions>;

    /// Apply `mutation` to the latest snapshot and persist it atomically.
    async fn modify(&self, mutation: RegistryMutation<'_>) -> Result<()>;

    /// Subscriptions of one channel; empty if it has none.
    async fn get_subscriptions_by_channel_id(
        &self,
        channel_id: &str,
    ) -> Result<ChannelSubscriptions> {
        Ok(self
            .get_subscriptions()
            .await?
            .by_channel_id
            .remove(channel_id)
            .unwrap_or_default())
    }
}
