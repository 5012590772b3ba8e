//! Optimistic read-modify-compare-and-set over a single key.
//!
//! The store offers no multi-key transactions, so every writer reads the
//! whole value, applies a pure modification, and writes back only if nobody
//! changed the value in between. Losers recompute against the new value.
//! The retry bound and delay are fixed: no backoff, no jitter.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use wikirelay_core::defaults::{ATOMIC_RETRY_WAIT_MS, ATOMIC_WRITE_ATTEMPTS};
use wikirelay_core::{Error, KvStore, Result};

/// Retry policy for [`atomic_modify`].
#[derive(Debug, Clone)]
pub struct AtomicModifyConfig {
    /// Compare-and-set attempts before giving up.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_wait: Duration,
}

impl Default for AtomicModifyConfig {
    fn default() -> Self {
        Self {
            max_attempts: ATOMIC_WRITE_ATTEMPTS,
            retry_wait: Duration::from_millis(ATOMIC_RETRY_WAIT_MS),
        }
    }
}

impl AtomicModifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt bound (at least one attempt is always made).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    /// Set the pause between attempts.
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }
}

/// Apply `modify` to the value under `key` and store the result with
/// compare-and-set, retrying on conflicting writers.
///
/// - `modify` receives `None` when the key is absent. Its errors abort
///   immediately without a write.
/// - If `modify` returns the bytes it was given, nothing is written.
/// - Store errors are returned immediately; only compare-and-set conflicts
///   are retried, up to `config.max_attempts` times.
pub async fn atomic_modify<F>(
    store: &dyn KvStore,
    key: &str,
    config: &AtomicModifyConfig,
    modify: F,
) -> Result<()>
where
    F: Fn(Option<&[u8]>) -> Result<Vec<u8>> + Send + Sync,
{
    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let initial = store
            .get(key)
            .await
            .map_err(|e| Error::Store(format!("unable to read initial value: {}", e)))?;
        let modified = modify(initial.as_deref())?;

        if initial.as_deref() == Some(modified.as_slice()) {
            debug!(
                subsystem = "store",
                component = "atomic_modify",
                attempt,
                "Modification was a no-op, skipping write"
            );
            return Ok(());
        }

        let written = store
            .compare_and_set(key, initial.as_deref(), &modified)
            .await
            .map_err(|e| Error::Store(format!("problem writing value: {}", e)))?;
        if written {
            debug!(
                subsystem = "store",
                component = "atomic_modify",
                attempt,
                duration_ms = start.elapsed().as_millis() as u64,
                "Value written"
            );
            return Ok(());
        }

        warn!(
            subsystem = "store",
            component = "atomic_modify",
            attempt,
            max_attempts = config.max_attempts,
            "Value changed since read, retrying"
        );
        if attempt >= config.max_attempts {
            return Err(Error::WriteAttemptLimit { attempts: attempt });
        }
        tokio::time::sleep(config.retry_wait).await;
    }
}
