use std::{future::Future, sync::Arc};

use axum::Router;
use configs::{AppConfig, StoreBackend};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, AppState};
use service::{observability, storage::MemoryCounterStore, CounterStore, InventoryService};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the counter store selected by configuration.
pub async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn CounterStore>, StartupError> {
    match cfg.store.backend {
        StoreBackend::Memory => {
            let store: Arc<dyn CounterStore> = MemoryCounterStore::new();
            Ok(store)
        }
        StoreBackend::Redis => connect_redis(cfg).await,
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(cfg: &AppConfig) -> Result<Arc<dyn CounterStore>, StartupError> {
    let url = cfg
        .store
        .redis_url
        .as_deref()
        .ok_or_else(|| StartupError::InvalidConfig("redis backend needs a redis_url".into()))?;
    let store = tokio::time::timeout(cfg.store.timeout(), service::storage::RedisCounterStore::connect(url))
        .await
        .map_err(|_| service::StoreError::Timeout(cfg.store.timeout()))??;
    let store: Arc<dyn CounterStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_cfg: &AppConfig) -> Result<Arc<dyn CounterStore>, StartupError> {
    Err(StartupError::InvalidConfig("built without the `redis` feature".into()))
}

/// Inventory service wired to the configured store, sell mode and timeout.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let store = build_store(cfg).await?;
    let inventory = InventoryService::new(store)
        .with_sell_mode(cfg.inventory.sell_mode)
        .with_timeout(cfg.store.timeout());
    info!(
        backend = inventory.backend(),
        sell_mode = ?inventory.sell_mode(),
        timeout_secs = cfg.store.timeout_secs,
        "inventory service ready"
    );
    Ok(routes::build_router(AppState::new(inventory), build_cors()))
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Public entry: build the app from `cfg` and serve until `shutdown` resolves.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(&cfg).await?;

    if let Some(admin_addr) = cfg.server.admin_addr.as_deref() {
        common::admin_http::spawn_admin_server(admin_addr, observability::encode_metrics).await?;
    }

    let listener = TcpListener::bind(cfg.server.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "listening");
    serve(listener, app, shutdown).await
}
