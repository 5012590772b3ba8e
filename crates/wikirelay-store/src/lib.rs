//! # wikirelay-store
//!
//! Storage layer for wikirelay.
//!
//! This crate provides:
//! - [`KvStore`] backends: in-process memory and Redis
//! - The optimistic compare-and-set update loop ([`atomic_modify`])
//! - [`KvSubscriptionRepository`], which persists the registry blob through it
//!
//! ## Example
//!
//! ```rust,ignore
//! use wikirelay_store::{KvBackend, KvSubscriptionRepository};
//!
//! let store = KvBackend::Redis("redis://localhost:6379".into()).connect().await?;
//! let repo = KvSubscriptionRepository::new(store);
//! let subs = repo.get_subscriptions().await?;
//! ```

pub mod atomic;
pub mod memory;
pub mod redis_store;
pub mod repository;

use std::sync::Arc;

use tracing::info;

// Re-export core types
pub use wikirelay_core::*;

pub use atomic::{atomic_modify, AtomicModifyConfig};
pub use memory::MemoryKvStore;
pub use redis_store::RedisKvStore;
pub use repository::KvSubscriptionRepository;

/// Which key-value backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvBackend {
    Memory,
    Redis(String),
}

impl KvBackend {
    /// Open the backend.
    pub async fn connect(&self) -> Result<Arc<dyn KvStore>> {
        match self {
            KvBackend::Memory => {
                info!(
                    subsystem = "store",
                    backend = "memory",
                    "Using in-process key-value store"
                );
                Ok(Arc::new(MemoryKvStore::new()))
            }
            KvBackend::Redis(url) => Ok(Arc::new(RedisKvStore::connect(url).await?)),
        }
    }
}
