//! Subscription repository over a key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use wikirelay_core::{
    subscription_key, KvStore, RegistryMutation, Result, SubscriptionRepository, Subscriptions,
};

use crate::atomic::{atomic_modify, AtomicModifyConfig};

/// Registry persisted as one JSON blob under a fixed key.
#[derive(Clone)]
pub struct KvSubscriptionRepository {
    store: Arc<dyn KvStore>,
    key: String,
    config: AtomicModifyConfig,
}

impl KvSubscriptionRepository {
    /// Create a repository using the default retry policy.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_config(store, AtomicModifyConfig::default())
    }

    pub fn with_config(store: Arc<dyn KvStore>, config: AtomicModifyConfig) -> Self {
        Self {
            store,
            key: subscription_key(),
            config,
        }
    }

    /// Storage key of the registry blob.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl SubscriptionRepository for KvSubscriptionRepository {
    async fn get_subscriptions(&self) -> Result<Subscriptions> {
        let bytes = self.store.get(&self.key).await?;
        Subscriptions::from_json(bytes.as_deref())
    }

    #[instrument(skip_all, fields(subsystem = "store", component = "repository"))]
    async fn modify(&self, mutation: RegistryMutation<'_>) -> Result<()> {
        atomic_modify(self.store.as_ref(), &self.key, &self.config, |initial| {
            let mut subs = Subscriptions::from_json(initial)?;
            mutation(&mut subs)?;
            subs.to_json()
        })
        .await
    }
}
