#![cfg(test)]
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Barrier;

use crate::errors::StoreError;
use crate::storage::{CounterStore, Decrement, MemoryCounterStore};
use common::types::Snapshot;

/// Memory store whose `peek` waits until `n` callers have peeked.
/// Forces concurrent sells to read before any of them writes.
pub struct PeekBarrierStore {
    inner: Arc<MemoryCounterStore>,
    barrier: Barrier,
}

impl PeekBarrierStore {
    pub fn new(n: usize) -> Arc<Self> {
        Arc::new(Self { inner: MemoryCounterStore::new(), barrier: Barrier::new(n) })
    }

    pub fn inner(&self) -> &MemoryCounterStore {
        &self.inner
    }
}

#[async_trait]
impl CounterStore for PeekBarrierStore {
    async fn peek(&self, key: &str) -> Result<i64, StoreError> {
        let value = self.inner.peek(key).await?;
        self.barrier.wait().await;
        Ok(value)
    }
    async fn add(&self, key: &str, n: i64) -> Result<i64, StoreError> { self.inner.add(key, n).await }
    async fn subtract(&self, key: &str, n: i64) -> Result<i64, StoreError> { self.inner.subtract(key, n).await }
    async fn subtract_if_available(&self, key: &str, n: i64) -> Result<Decrement, StoreError> {
        self.inner.subtract_if_available(key, n).await
    }
    async fn list_all(&self) -> Result<Snapshot, StoreError> { self.inner.list_all().await }
    fn backend(&self) -> &'static str { "peek-barrier" }
}

/// Store that never answers.
pub struct StalledStore;

#[async_trait]
impl CounterStore for StalledStore {
    async fn peek(&self, _key: &str) -> Result<i64, StoreError> { std::future::pending().await }
    async fn add(&self, _key: &str, _n: i64) -> Result<i64, StoreError> { std::future::pending().await }
    async fn subtract(&self, _key: &str, _n: i64) -> Result<i64, StoreError> { std::future::pending().await }
    async fn subtract_if_available(&self, _key: &str, _n: i64) -> Result<Decrement, StoreError> {
        std::future::pending().await
    }
    async fn list_all(&self) -> Result<Snapshot, StoreError> { std::future::pending().await }
    fn backend(&self) -> &'static str { "stalled" }
}

/// Refuses every conditional decrement; every other call fails as unreachable.
pub struct RefusingFlakyStore {
    pub available: i64,
}

#[async_trait]
impl CounterStore for RefusingFlakyStore {
    async fn peek(&self, _key: &str) -> Result<i64, StoreError> { Err(dropped()) }
    async fn add(&self, _key: &str, _n: i64) -> Result<i64, StoreError> { Err(dropped()) }
    async fn subtract(&self, _key: &str, _n: i64) -> Result<i64, StoreError> { Err(dropped()) }
    async fn subtract_if_available(&self, _key: &str, _n: i64) -> Result<Decrement, StoreError> {
        Ok(Decrement::Refused { available: self.available })
    }
    async fn list_all(&self) -> Result<Snapshot, StoreError> { Err(dropped()) }
    fn backend(&self) -> &'static str { "refusing-flaky" }
}

fn dropped() -> StoreError {
    StoreError::Unavailable("connection dropped".to_string())
}
