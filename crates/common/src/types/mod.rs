use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every known fruit with its current quantity, ordered by name.
pub type Snapshot = BTreeMap<String, i64>;

/// Body returned by every successful inventory endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FruitsResponse {
    pub fruits: Snapshot,
}

impl From<Snapshot> for FruitsResponse {
    fn from(fruits: Snapshot) -> Self {
        Self { fruits }
    }
}
