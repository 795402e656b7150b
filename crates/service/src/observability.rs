use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static FRUITS_BOUGHT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("fruit_stand_bought_total", "Units added by accepted buys")
        .expect("register bought_total")
});

pub static FRUITS_SOLD_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("fruit_stand_sold_total", "Units removed by accepted sells")
        .expect("register sold_total")
});

pub static SELL_REJECTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fruit_stand_sell_rejected_total",
        "Sells rejected for insufficient stock"
    )
    .expect("register sell_rejected_total")
});

pub static STORE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fruit_stand_store_errors_total",
        "Counter store failures and timeouts"
    )
    .expect("register store_errors_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
