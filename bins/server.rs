use dotenvy::dotenv;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Load config, falling back to defaults so the process can still report why it stops.
fn load_config() -> (configs::AppConfig, Option<anyhow::Error>) {
    match configs::AppConfig::load_and_validate() {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            let mut cfg = configs::AppConfig::default();
            // env overrides (MONGO_HOST, ...) still apply on top of defaults
            if let Err(env_err) = cfg.normalize_and_validate() {
                return (cfg, Some(env_err));
            }
            (cfg, Some(e))
        }
    }
}

fn main() -> std::process::ExitCode {
    // .env first so RUST_LOG / MONGO_HOST take effect
    dotenv().ok();
    let (cfg, config_error) = load_config();
    common::utils::logging::init_logging(&cfg.server.log_format);
    info!(service = "record_api", event = "logger_init", "tracing subscriber initialized");

    if let Some(e) = config_error {
        if std::env::var("CONFIG_PATH").is_ok() {
            error!(service = "record_api", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
        warn!(service = "record_api", event = "config_default", error = %e, "no usable config.toml; using defaults");
    }

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "record_api", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let worker_threads = cfg
        .server
        .worker_threads
        .or_else(|| std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "record_api", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "record_api",
        event = "start",
        %service_id,
        pid,
        version,
        backend = ?cfg.storage.backend,
        threads = worker_threads.unwrap_or_default(),
        "record api starting"
    );

    rt.block_on(async move {
        let server_task = tokio::spawn(server::run(cfg));

        tokio::select! {
            res = server_task => match res {
                Ok(Ok(())) => {
                    info!(service = "record_api", event = "stop", %service_id, pid, "server stopped normally");
                    std::process::ExitCode::SUCCESS
                }
                Ok(Err(e)) => {
                    error!(service = "record_api", event = "run_failed", error = %e, "server::run returned error");
                    std::process::ExitCode::FAILURE
                }
                Err(e) => {
                    error!(service = "record_api", event = "task_join_error", error = %e, "server task join error");
                    std::process::ExitCode::FAILURE
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(service = "record_api", event = "shutdown_signal", %service_id, pid, "received Ctrl+C, shutting down");
                std::process::ExitCode::SUCCESS
            }
        }
    })
}
