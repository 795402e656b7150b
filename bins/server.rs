use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn init_logging() {
    // .env first so RUST_LOG and LOG_FORMAT take effect
    dotenv().ok();
    common::utils::logging::init_logging_from_env();
    info!(service = "fruit_stand", event = "logger_init", "tracing subscriber initialized");
}

async fn shutdown_signal(service_id: Uuid) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(service = "fruit_stand", event = "signal_error", error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!(service = "fruit_stand", event = "shutdown_signal", %service_id, "received Ctrl+C, shutting down");
}

fn main() -> std::process::ExitCode {
    init_logging();

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "fruit_stand",
            event = "panic",
            %service_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "fruit_stand", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.server.worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "fruit_stand", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "fruit_stand",
        event = "start",
        %service_id,
        pid,
        version,
        addr = %cfg.server.bind_addr(),
        backend = ?cfg.store.backend,
        "fruit stand starting"
    );

    rt.block_on(async move {
        match server::run(cfg, shutdown_signal(service_id)).await {
            Ok(()) => {
                info!(service = "fruit_stand", event = "stop", %service_id, pid, "server stopped normally");
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = "fruit_stand", event = "run_failed", error = %e, "server::run returned error");
                std::process::ExitCode::FAILURE
            }
        }
    })
}
