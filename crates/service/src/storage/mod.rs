//! Counter store abstraction and its backends.
//!
//! A store maps fruit names to integer quantities. Each primitive is atomic
//! for its own key; nothing here enforces business rules.

use async_trait::async_trait;

use crate::errors::StoreError;
use common::types::Snapshot;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;

pub use memory::MemoryCounterStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisCounterStore;

/// Result of [`CounterStore::subtract_if_available`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The value was decremented; carries the new total.
    Applied(i64),
    /// Not enough stock; nothing changed. Carries the value seen by the refusing check.
    Refused { available: i64 },
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value, or 0 when the key has never been written. Never mutates.
    async fn peek(&self, key: &str) -> Result<i64, StoreError>;

    /// Add `n` and return the new total; absent keys start at 0.
    async fn add(&self, key: &str, n: i64) -> Result<i64, StoreError>;

    /// Subtract `n` and return the new total, even if it is negative.
    async fn subtract(&self, key: &str, n: i64) -> Result<i64, StoreError>;

    /// Subtract `n` only if the current value is at least `n`, as one atomic step.
    async fn subtract_if_available(&self, key: &str, n: i64) -> Result<Decrement, StoreError>;

    /// Every key with its value. Each value is read atomically, the map as a whole is not.
    async fn list_all(&self) -> Result<Snapshot, StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}
