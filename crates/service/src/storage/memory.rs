use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CounterStore, Decrement};
use crate::errors::StoreError;
use common::types::Snapshot;

/// In-process counter store.
///
/// Each key lives in a `DashMap` shard; updates hold that shard's lock for the
/// duration of a single read-modify-write, so updates on one key serialize while
/// other keys proceed independently.
#[derive(Default, Clone)]
pub struct MemoryCounterStore {
    inner: Arc<DashMap<String, i64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn apply(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut entry = self.inner.entry(key.to_string()).or_insert(0);
        let next = entry.checked_add(delta).ok_or_else(overflow)?;
        *entry = next;
        Ok(next)
    }
}

fn overflow() -> StoreError {
    StoreError::Backend("increment or decrement would overflow".to_string())
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn peek(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.inner.get(key).map(|v| *v).unwrap_or(0))
    }

    async fn add(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        self.apply(key, n)
    }

    async fn subtract(&self, key: &str, n: i64) -> Result<i64, StoreError> {
        let delta = n.checked_neg().ok_or_else(overflow)?;
        self.apply(key, delta)
    }

    async fn subtract_if_available(&self, key: &str, n: i64) -> Result<Decrement, StoreError> {
        // Absent keys hold 0 and are never created here.
        let Some(mut entry) = self.inner.get_mut(key) else {
            return Ok(if n <= 0 { Decrement::Applied(0) } else { Decrement::Refused { available: 0 } });
        };
        if *entry < n {
            return Ok(Decrement::Refused { available: *entry });
        }
        let next = entry.checked_sub(n).ok_or_else(overflow)?;
        *entry = next;
        Ok(Decrement::Applied(next))
    }

    async fn list_all(&self) -> Result<Snapshot, StoreError> {
        Ok(self.inner.iter().map(|e| (e.key().clone(), *e.value())).collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
