use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, Uri},
    routing::any,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use common::types::FruitsResponse;
use service::{InventoryService, Side};

use crate::errors::ApiError;
use crate::request::{parse_adjustment, AdjustQuery};

#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<InventoryService>,
}

impl AppState {
    pub fn new(inventory: InventoryService) -> Self {
        Self { inventory: Arc::new(inventory) }
    }
}

type ApiResult = Result<Json<FruitsResponse>, ApiError>;

async fn list(State(state): State<AppState>) -> ApiResult {
    Ok(Json(state.inventory.snapshot().await?.into()))
}

async fn adjust(
    state: AppState,
    side: Side,
    method: Method,
    query: Option<Query<Vec<(String, String)>>>,
    body: Bytes,
) -> ApiResult {
    // Only GET and POST adjust; other methods just read the inventory.
    if method != Method::GET && method != Method::POST {
        return list(State(state)).await;
    }
    let query = query.map(|Query(pairs)| AdjustQuery::from_pairs(pairs)).unwrap_or_default();
    let req = parse_adjustment(&query, &body)?;
    info!(?side, fruit = %req.fruit, quantity = req.quantity, "adjustment requested");
    Ok(Json(state.inventory.adjust(side, &req).await?.into()))
}

async fn buy(
    State(state): State<AppState>,
    method: Method,
    query: Option<Query<Vec<(String, String)>>>,
    body: Bytes,
) -> ApiResult {
    adjust(state, Side::Buy, method, query, body).await
}

async fn sell(
    State(state): State<AppState>,
    method: Method,
    query: Option<Query<Vec<(String, String)>>>,
    body: Bytes,
) -> ApiResult {
    adjust(state, Side::Sell, method, query, body).await
}

async fn invalid_request(uri: Uri) -> ApiError {
    ApiError::bad_request(format!("Invalid API request at: {}", uri.path()))
}

/// Build the inventory router: `/`, `/buy`, `/sell`, and a 400 fallback.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", any(list))
        .route("/buy", any(buy))
        .route("/sell", any(sell))
        .fallback(invalid_request)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
