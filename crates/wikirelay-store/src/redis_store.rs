//! Redis-backed key-value store.
//!
//! Compare-and-set runs as a Lua script so the read and the conditional
//! write happen atomically on the server, which makes it safe across
//! processes sharing one Redis.
//!
//! ## Configuration
//!
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{error, info};

use wikirelay_core::{Error, KvStore, Result};

/// KEYS[1] = key, ARGV[1] = "1" if a prior value is expected, ARGV[2] =
/// expected value, ARGV[3] = new value. Returns 1 when written.
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '0' then
  if current then
    return 0
  end
elseif current ~= ARGV[2] then
  return 0
end
redis.call('SET', KEYS[1], ARGV[3])
return 1
"#;

#[derive(Clone)]
pub struct RedisKvStore {
    connection: ConnectionManager,
    compare_and_set: redis::Script,
}

impl RedisKvStore {
    /// Connect to Redis at `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Config(format!("invalid Redis URL: {}", e)))?;
        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!(subsystem = "store", component = "redis", error = %e, "Redis connection failed");
            Error::Store(format!("unable to connect to Redis: {}", e))
        })?;

        info!(
            subsystem = "store",
            component = "redis",
            url = %redis_url.replace(|c: char| c.is_ascii_alphanumeric(), "*"),
            "Redis key-value store connected"
        );

        Ok(Self {
            connection,
            compare_and_set: redis::Script::new(COMPARE_AND_SET_SCRIPT),
        })
    }
}

fn store_error(op: &str, e: redis::RedisError) -> Error {
    Error::Store(format!("Redis {} failed: {}", op, e))
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| store_error("GET", e))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| store_error("SET", e))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool> {
        let mut conn = self.connection.clone();
        let has_expected = if expected.is_some() { "1" } else { "0" };
        let written: i64 = self
            .compare_and_set
            .key(key)
            .arg(has_expected)
            .arg(expected.unwrap_or_default())
            .arg(new)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error("compare-and-set", e))?;
        Ok(written == 1)
    }
}
