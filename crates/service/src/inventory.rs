//! Buy/sell rules on top of a [`CounterStore`].
//!
//! The service holds no state of its own besides the injected store, so a single
//! instance is shared by every request handler.
//!
//! Sells come in two flavours, chosen by [`SellMode`]:
//! - `CheckThenSubtract` peeks the quantity and subtracts in a second call. The gap
//!   between the two is unguarded: two sells racing on one key can both pass the
//!   check and leave the quantity negative.
//! - `Conditional` delegates to [`CounterStore::subtract_if_available`], which
//!   checks and subtracts atomically.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

pub use configs::SellMode;

use crate::errors::{ServiceError, StoreError, ValidationError};
use crate::observability::{FRUITS_BOUGHT_TOTAL, FRUITS_SOLD_TOTAL, SELL_REJECTED_TOTAL, STORE_ERRORS_TOTAL};
use crate::storage::{CounterStore, Decrement};
use common::types::Snapshot;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentRequest {
    pub fruit: String,
    pub quantity: i64,
}

impl AdjustmentRequest {
    pub fn new(fruit: impl Into<String>, quantity: i64) -> Self {
        Self { fruit: fruit.into(), quantity }
    }
}

/// Reject empty fruit names and non-positive quantities.
pub fn validate(fruit: &str, quantity: i64) -> Result<(), ValidationError> {
    if fruit.is_empty() || quantity == 0 {
        return Err(ValidationError::MissingField);
    }
    if quantity < 0 {
        return Err(ValidationError::NotPositive);
    }
    Ok(())
}

pub struct InventoryService {
    store: Arc<dyn CounterStore>,
    sell_mode: SellMode,
    timeout: Duration,
}

impl InventoryService {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store, sell_mode: SellMode::default(), timeout: DEFAULT_STORE_TIMEOUT }
    }

    pub fn with_sell_mode(mut self, sell_mode: SellMode) -> Self {
        self.sell_mode = sell_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sell_mode(&self) -> SellMode {
        self.sell_mode
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Bound a store call by the configured timeout.
    async fn call<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let res = match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };
        if let Err(e) = &res {
            STORE_ERRORS_TOTAL.inc();
            warn!(backend = self.store.backend(), error = %e, "counter store call failed");
        }
        res
    }

    /// Current quantity of `fruit`; 0 if it was never bought.
    pub async fn get(&self, fruit: &str) -> Result<i64, ServiceError> {
        Ok(self.call(self.store.peek(fruit)).await?)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, ServiceError> {
        Ok(self.call(self.store.list_all()).await?)
    }

    pub async fn adjust(&self, side: Side, req: &AdjustmentRequest) -> Result<Snapshot, ServiceError> {
        match side {
            Side::Buy => self.buy(&req.fruit, req.quantity).await,
            Side::Sell => self.sell(&req.fruit, req.quantity).await,
        }
    }

    pub async fn buy(&self, fruit: &str, quantity: i64) -> Result<Snapshot, ServiceError> {
        validate(fruit, quantity)?;
        let total = self.call(self.store.add(fruit, quantity)).await?;
        FRUITS_BOUGHT_TOTAL.inc_by(quantity as u64);
        debug!(%fruit, quantity, total, "bought");
        self.snapshot().await
    }

    pub async fn sell(&self, fruit: &str, quantity: i64) -> Result<Snapshot, ServiceError> {
        validate(fruit, quantity)?;
        let total = match self.sell_mode {
            SellMode::CheckThenSubtract => self.check_then_subtract(fruit, quantity).await?,
            SellMode::Conditional => self.conditional_subtract(fruit, quantity).await?,
        };
        FRUITS_SOLD_TOTAL.inc_by(quantity as u64);
        debug!(%fruit, quantity, total, "sold");
        self.snapshot().await
    }

    // Not atomic: another sell may land between the peek and the subtract.
    async fn check_then_subtract(&self, fruit: &str, quantity: i64) -> Result<i64, ServiceError> {
        let current = self.call(self.store.peek(fruit)).await?;
        if current < quantity {
            return Err(self.reject(fruit, current, quantity));
        }
        Ok(self.call(self.store.subtract(fruit, quantity)).await?)
    }

    async fn conditional_subtract(&self, fruit: &str, quantity: i64) -> Result<i64, ServiceError> {
        match self.call(self.store.subtract_if_available(fruit, quantity)).await? {
            Decrement::Applied(total) => Ok(total),
            Decrement::Refused { available } => Err(self.reject(fruit, available, quantity)),
        }
    }

    fn reject(&self, fruit: &str, available: i64, requested: i64) -> ServiceError {
        SELL_REJECTED_TOTAL.inc();
        warn!(%fruit, available, requested, "sell rejected: not enough fruits");
        ServiceError::insufficient(fruit, available, requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCounterStore;
    use crate::test_support::{PeekBarrierStore, RefusingFlakyStore, StalledStore};

    fn service() -> InventoryService {
        InventoryService::new(MemoryCounterStore::new())
    }

    fn snapshot_of(pairs: &[(&str, i64)]) -> Snapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn untouched_fruit_is_zero() -> Result<(), anyhow::Error> {
        let svc = service();
        assert_eq!(svc.get("durian").await?, 0);
        assert_eq!(svc.get("Apple").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn sequential_buys_sum() -> Result<(), anyhow::Error> {
        let svc = service();
        for (q1, q2) in [(1, 1), (3, 7), (100, 1)] {
            let key = format!("fruit-{q1}-{q2}");
            svc.buy(&key, q1).await?;
            svc.buy(&key, q2).await?;
            assert_eq!(svc.get(&key).await?, q1 + q2);
        }
        Ok(())
    }

    #[tokio::test]
    async fn selling_exact_stock_leaves_zero() -> Result<(), anyhow::Error> {
        let svc = service();
        svc.buy("mango", 4).await?;
        let snapshot = svc.sell("mango", 4).await?;
        assert_eq!(snapshot, snapshot_of(&[("mango", 0)]));
        assert_eq!(svc.get("mango").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn oversell_is_rejected_without_mutation() -> Result<(), anyhow::Error> {
        for mode in [SellMode::CheckThenSubtract, SellMode::Conditional] {
            let svc = service().with_sell_mode(mode);
            svc.buy("lime", 2).await?;
            let err = svc.sell("lime", 3).await.unwrap_err();
            match err {
                ServiceError::InsufficientStock { fruit, available, requested } => {
                    assert_eq!((fruit.as_str(), available, requested), ("lime", 2, 3));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(svc.get("lime").await?, 2);

            // never-bought fruit is treated as zero stock
            assert!(matches!(svc.sell("quince", 1).await, Err(ServiceError::InsufficientStock { .. })));
        }
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_is_stable_without_writes() -> Result<(), anyhow::Error> {
        let svc = service();
        svc.buy("apple", 1).await?;
        svc.buy("banana", 2).await?;
        assert_eq!(svc.snapshot().await?, svc.snapshot().await?);
        Ok(())
    }

    #[tokio::test]
    async fn apple_walkthrough() -> Result<(), anyhow::Error> {
        let svc = service();
        assert_eq!(svc.buy("apple", 5).await?, snapshot_of(&[("apple", 5)]));
        assert_eq!(svc.sell("apple", 2).await?, snapshot_of(&[("apple", 3)]));

        let err = svc.sell("apple", 10).await.unwrap_err();
        assert_eq!(err.to_string(), "not enough fruits");
        assert_eq!(svc.snapshot().await?, snapshot_of(&[("apple", 3)]));

        assert!(matches!(
            svc.buy("", 5).await,
            Err(ServiceError::InvalidArgument(ValidationError::MissingField))
        ));
        assert!(matches!(
            svc.buy("apple", -1).await,
            Err(ServiceError::InvalidArgument(ValidationError::NotPositive))
        ));
        assert!(matches!(
            svc.sell("apple", 0).await,
            Err(ServiceError::InvalidArgument(ValidationError::MissingField))
        ));
        assert_eq!(svc.snapshot().await?, snapshot_of(&[("apple", 3)]));
        Ok(())
    }

    #[tokio::test]
    async fn adjust_dispatches_by_side() -> Result<(), anyhow::Error> {
        let svc = service();
        let req = AdjustmentRequest::new("cherry", 6);
        svc.adjust(Side::Buy, &req).await?;
        let snapshot = svc.adjust(Side::Sell, &AdjustmentRequest::new("cherry", 1)).await?;
        assert_eq!(snapshot, snapshot_of(&[("cherry", 5)]));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_sells_overdraw_with_check_then_subtract() -> Result<(), anyhow::Error> {
        // Both sells peek before either subtracts.
        let store = PeekBarrierStore::new(2);
        store.inner().add("apple", 2).await?;
        let svc = Arc::new(InventoryService::new(store.clone()).with_sell_mode(SellMode::CheckThenSubtract));

        let (a, b) = tokio::join!(
            tokio::spawn({
                let svc = Arc::clone(&svc);
                async move { svc.sell("apple", 2).await }
            }),
            tokio::spawn({
                let svc = Arc::clone(&svc);
                async move { svc.sell("apple", 2).await }
            }),
        );
        assert!(a?.is_ok());
        assert!(b?.is_ok());
        assert_eq!(store.inner().peek("apple").await?, -2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_sells_never_overdraw_with_conditional() -> Result<(), anyhow::Error> {
        let store = MemoryCounterStore::new();
        store.add("apple", 2).await?;
        let svc = Arc::new(InventoryService::new(store.clone()).with_sell_mode(SellMode::Conditional));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move { svc.sell("apple", 2).await }));
        }
        let mut accepted = 0;
        for h in handles {
            match h.await? {
                Ok(_) => accepted += 1,
                Err(ServiceError::InsufficientStock { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(store.peek("apple").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn conditional_refusal_stands_without_a_second_read() -> Result<(), anyhow::Error> {
        // every call other than the conditional decrement fails on this store
        let svc = InventoryService::new(Arc::new(RefusingFlakyStore { available: 1 }))
            .with_sell_mode(SellMode::Conditional);
        match svc.sell("apple", 2).await {
            Err(ServiceError::InsufficientStock { fruit, available, requested }) => {
                assert_eq!((fruit.as_str(), available, requested), ("apple", 1, 2));
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn slow_store_surfaces_timeout() -> Result<(), anyhow::Error> {
        let svc = InventoryService::new(Arc::new(StalledStore)).with_timeout(Duration::from_millis(50));
        let err = svc.buy("apple", 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Timeout(_))));
        let err = svc.snapshot().await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Timeout(_))));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_store() -> Result<(), anyhow::Error> {
        // StalledStore would time out if touched
        let svc = InventoryService::new(Arc::new(StalledStore)).with_timeout(Duration::from_secs(60));
        assert!(matches!(svc.sell("", 1).await, Err(ServiceError::InvalidArgument(_))));
        assert!(matches!(svc.buy("x", -4).await, Err(ServiceError::InvalidArgument(_))));
        Ok(())
    }
}
