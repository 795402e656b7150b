//! Adjustment input parsing.
//!
//! Two sources, tried in order:
//! 1. the query string, used only when it carries both a non-empty `fruit` and a
//!    non-empty `quantity`;
//! 2. otherwise a JSON body `{"fruit": "...", "quantity": n}`.
//!
//! Range checks (empty fruit, non-positive quantity) are left to the inventory service.

use serde::Deserialize;
use service::{AdjustmentRequest, ValidationError};

#[derive(Debug, Default)]
pub struct AdjustQuery {
    pub fruit: Option<String>,
    pub quantity: Option<String>,
}

impl AdjustQuery {
    /// Pick `fruit` and `quantity` out of raw query pairs. A repeated key keeps its first value.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "fruit" => &mut query.fruit,
                "quantity" => &mut query.quantity,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

#[derive(Debug, Deserialize)]
struct AdjustBody {
    #[serde(default)]
    fruit: String,
    #[serde(default)]
    quantity: i64,
}

pub fn parse_adjustment(query: &AdjustQuery, body: &[u8]) -> Result<AdjustmentRequest, ValidationError> {
    if let Some(req) = from_query(query)? {
        return Ok(req);
    }
    from_body(body)
}

fn from_query(query: &AdjustQuery) -> Result<Option<AdjustmentRequest>, ValidationError> {
    let (Some(fruit), Some(quantity)) = (query.fruit.as_deref(), query.quantity.as_deref()) else {
        return Ok(None);
    };
    if fruit.is_empty() || quantity.is_empty() {
        return Ok(None);
    }
    let quantity = quantity.parse::<i64>().map_err(|_| ValidationError::NotANumber)?;
    Ok(Some(AdjustmentRequest::new(fruit, quantity)))
}

fn from_body(body: &[u8]) -> Result<AdjustmentRequest, ValidationError> {
    let body: AdjustBody = serde_json::from_slice(body).map_err(|_| ValidationError::MissingField)?;
    Ok(AdjustmentRequest::new(body.fruit, body.quantity))
}
