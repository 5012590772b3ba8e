//! Server configuration from the environment.
//!
//! ## Environment variables
//!
//! - `HOST` / `PORT`: listen address (default: 0.0.0.0:3000)
//! - `KV_BACKEND`: `memory` or `redis` (default: memory)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)
//! - `WIKI_URL`: wiki base URL used when an inbound event names no site
//! - `WIKI_SERVER_V9_OR_ABOVE`: selects the supported-event catalogue
//! - `NOTIFY_WEBHOOK_URL`: outbound chat webhook; notifications are only
//!   logged when unset
//! - `ATOMIC_WRITE_ATTEMPTS` / `ATOMIC_RETRY_WAIT_MS`: registry update
//!   retry policy (default: 5 attempts, 30ms apart)

use std::str::FromStr;
use std::time::Duration;

use wikirelay_core::defaults::{
    ATOMIC_RETRY_WAIT_MS, ATOMIC_WRITE_ATTEMPTS, REDIS_URL, SERVER_HOST, SERVER_PORT,
};
use wikirelay_core::{Error, Result};
use wikirelay_store::{AtomicModifyConfig, KvBackend};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub kv_backend: KvBackend,
    /// Wiki base URL without a trailing slash; may be empty.
    pub wiki_url: String,
    pub server_v9_or_above: bool,
    pub notify_webhook_url: Option<String>,
    pub atomic: AtomicModifyConfig,
}

impl RelayConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let kv_backend = match var("KV_BACKEND").as_deref().map(str::trim) {
            None | Some("memory") => KvBackend::Memory,
            Some("redis") => {
                KvBackend::Redis(var("REDIS_URL").unwrap_or_else(|| REDIS_URL.to_string()))
            }
            Some(other) => {
                return Err(Error::Config(format!(
                    "unknown KV_BACKEND '{}', expected 'memory' or 'redis'",
                    other
                )))
            }
        };

        let atomic = AtomicModifyConfig::new()
            .max_attempts(parse_or(var("ATOMIC_WRITE_ATTEMPTS"), ATOMIC_WRITE_ATTEMPTS))
            .retry_wait(Duration::from_millis(parse_or(
                var("ATOMIC_RETRY_WAIT_MS"),
                ATOMIC_RETRY_WAIT_MS,
            )));

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| SERVER_HOST.to_string()),
            port: parse_or(var("PORT"), SERVER_PORT),
            kv_backend,
            wiki_url: var("WIKI_URL")
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
            server_v9_or_above: var("WIKI_SERVER_V9_OR_ABOVE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            notify_webhook_url: var("NOTIFY_WEBHOOK_URL"),
            atomic,
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
