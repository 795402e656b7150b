//! Inventory core: the counter store abstraction and the buy/sell rules on top of it.
//! - `storage` holds the key -> quantity backends.
//! - `inventory` enforces validation and the non-negativity check for sells.

pub mod errors;
pub mod storage;
pub mod inventory;
pub mod observability;
#[cfg(test)]
pub mod test_support;

pub use common::types::Snapshot;
pub use errors::{ServiceError, StoreError, ValidationError};
pub use inventory::{AdjustmentRequest, InventoryService, Side};
pub use storage::CounterStore;
