use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Listener for `/healthz` and `/metrics`; disabled when unset.
    #[serde(default)]
    pub admin_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: None, admin_addr: None }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: StoreBackend::Memory, redis_url: None, timeout_secs: default_timeout_secs() }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How a sell guards against driving a quantity below zero.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SellMode {
    /// Read the quantity, then subtract. Two concurrent sells may both pass the check.
    #[default]
    CheckThenSubtract,
    /// Single conditional decrement in the store; never overdraws.
    Conditional,
}

impl std::str::FromStr for SellMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "check_then_subtract" => Ok(Self::CheckThenSubtract),
            "conditional" => Ok(Self::Conditional),
            other => Err(anyhow!("unknown sell mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InventoryConfig {
    #[serde(default)]
    pub sell_mode: SellMode,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8081 }
fn default_timeout_secs() -> u64 { 5 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        return Ok(AppConfig::default());
    }
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// File (or defaults), then process environment, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay values from `lookup`, which maps variable names to values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = port.trim().parse().map_err(|_| anyhow!("API_PORT must be a port number, got `{port}`"))?;
        }
        if let Some(threads) = lookup("TOKIO_WORKER_THREADS") {
            let threads = threads.trim().parse().map_err(|_| anyhow!("TOKIO_WORKER_THREADS must be a whole number, got `{threads}`"))?;
            self.server.worker_threads = Some(threads);
        }
        if let Some(addr) = lookup("ADMIN_ADDR") {
            self.server.admin_addr = Some(addr);
        }
        // REDIS_URL alone is enough to switch to the redis backend.
        if let Some(url) = lookup("REDIS_URL") {
            self.store.redis_url = Some(url);
            self.store.backend = StoreBackend::Redis;
        }
        if let Some(backend) = lookup("STORE_BACKEND") {
            self.store.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "redis" => StoreBackend::Redis,
                other => return Err(anyhow!("unknown store backend `{other}`")),
            };
        }
        if let Some(secs) = lookup("STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = secs.trim().parse().map_err(|_| anyhow!("STORE_TIMEOUT_SECS must be a whole number of seconds"))?;
        }
        if let Some(mode) = lookup("SELL_MODE") {
            self.inventory.sell_mode = mode.parse()?;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.store.normalize()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        if matches!(&self.admin_addr, Some(a) if a.trim().is_empty()) {
            self.admin_addr = None;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StoreConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("store.timeout_secs must be a positive number of seconds"));
        }
        if let Some(url) = self.redis_url.take() {
            let url = url.trim().to_string();
            if !url.is_empty() {
                self.redis_url = Some(normalize_redis_url(&url));
            }
        }
        if self.backend == StoreBackend::Redis && self.redis_url.is_none() {
            return Err(anyhow!("store.backend is redis but no store.redis_url or REDIS_URL was given"));
        }
        Ok(())
    }
}

/// Accepts bare `host:port` addresses as well as full `redis://` URLs.
pub fn normalize_redis_url(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("redis://{raw}")
    }
}
