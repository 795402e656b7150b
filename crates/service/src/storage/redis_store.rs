//! Redis-backed counter store.
//!
//! Every fruit is a plain integer key. `INCRBY`/`DECRBY` give single round-trip
//! atomic updates; the conditional decrement runs as a Lua script so the check and
//! the write happen inside one Redis command.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{RedisError, Script};
use tracing::debug;

use super::{CounterStore, Decrement};
use crate::errors::StoreError;
use common::types::Snapshot;

/// Replies with a two-element array `{applied, value}`:
/// `{1, new_total}` after decrementing, `{0, current}` when refused (key untouched).
const DECREMENT_IF_AVAILABLE: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local n = tonumber(ARGV[1])
if current < n then
  return {0, current}
end
return {1, redis.call('DECRBY', KEYS[1], n)}
"#;

fn decode_decrement((applied, value): (i64, i64)) -> Decrement {
    if applied == 1 {
        Decrement::Applied(value)
    } else {
        Decrement::Refused { available: value }
    }
}

#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    decrement_script: Script,
}

impl RedisCounterStore {
    /// Open a managed connection to `redis_url` (e.g. `redis://localhost:6379`).
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(map_err)?;
        let conn = client.get_connection_manager().await.map_err(map_err)?;
        debug!(%redis_url, "connected to redis");
        Ok(Self { conn, decrement_script: Script::new(DECREMENT_IF_AVAILABLE) })
    }
}

fn map_err(e: RedisError) -> StoreError {
    if e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn peek(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = redis::cmd("GET").arg(key).query_async(&mut conn).await.map_err(map_err)?;
        Ok(value.unwrap_or(0))
    }

    async fn add(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("INCRBY").arg(key).arg(n).query_async(&mut conn).await.map_err(map_err)
    }

    async fn subtract(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("DECRBY").arg(key).arg(n).query_async(&mut conn).await.map_err(map_err)
    }

    async fn subtract_if_available(&self, key: &str, n: i64) -> Result<Decrement, StoreError> {
        let mut conn = self.conn.clone();
        let reply: (i64, i64) = self
            .decrement_script
            .key(key)
            .arg(n)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(decode_decrement(reply))
    }

    async fn list_all(&self) -> Result<Snapshot, StoreError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS").arg("*").query_async(&mut conn).await.map_err(map_err)?;
        let mut snapshot = Snapshot::new();
        for key in keys {
            let value = self.peek(&key).await?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
