use std::{path::Path, sync::Arc, time::Duration};

use axum::Router;
use rand::Rng;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use configs::AppConfig;
use models::FieldTypes;
use service::Storage;

use crate::errors::StartupError;
use crate::metrics;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<String, StartupError> {
    if cfg.server.host.trim().is_empty() {
        return Err(StartupError::InvalidConfig("server.host is empty".into()));
    }
    Ok(format!("{}:{}", cfg.server.host.trim(), cfg.server.port))
}

/// Seed the store once per deployment.
///
/// Replicas sleep a random slice of `jitter_ms` first so that only one of them
/// sees an empty reload history and loads the demo file.
pub async fn seed_if_fresh(storage: &dyn Storage, demo_data_file: &Path, jitter_ms: u64) -> Result<bool, StartupError> {
    if !common::env::ensure_env(demo_data_file).await? {
        return Ok(false);
    }
    if jitter_ms > 0 {
        let delay = rand::thread_rng().gen_range(0..jitter_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if storage.count_reloads().await? > 0 {
        info!("demo data already loaded by an earlier start; skipping seed");
        return Ok(false);
    }
    let loaded = storage.reload_data(demo_data_file).await?;
    metrics::RELOADS_TOTAL.inc();
    info!(loaded, path = %demo_data_file.display(), "demo data seeded");
    Ok(true)
}

/// Build the router around an already configured backend.
pub fn app(storage: Arc<dyn Storage>, cfg: &AppConfig) -> Router {
    routes::build_router(AppState::new(storage, &cfg.api), build_cors())
}

/// Public entry: connect storage, seed, and run the HTTP server
pub async fn run(cfg: AppConfig) -> Result<(), StartupError> {
    let field_types = FieldTypes::from_config(&cfg.api);
    let storage = service::configure(&cfg, field_types).await?;

    let demo = Path::new(&cfg.api.demo_data_file);
    if let Err(e) = seed_if_fresh(storage.as_ref(), demo, cfg.api.startup_jitter_ms).await {
        warn!(error = %e, "initial seed failed; serving without demo data");
    }

    let app = app(storage, &cfg);
    let addr = bind_addr(&cfg)?;
    info!(%addr, route = %cfg.api.route, "starting record api");
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(anyhow::Error::from)?;
    axum::serve(listener, app).await.map_err(anyhow::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::storage::MockStorage;

    async fn demo_file() -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("seed_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "{\"title\": \"Blue\", \"artist\": \"Joni Mitchell\"}\n")
            .await
            .expect("write demo file");
        path
    }

    #[tokio::test]
    async fn seeds_only_once() -> Result<(), StartupError> {
        let storage = MockStorage::new(FieldTypes::new());
        let path = demo_file().await;
        assert!(seed_if_fresh(&storage, &path, 0).await?);
        assert!(!seed_if_fresh(&storage, &path, 0).await?);
        assert_eq!(storage.count().await?, 1);
        assert_eq!(storage.count_reloads().await?, 1);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_demo_file_skips_seed() -> Result<(), StartupError> {
        let storage = MockStorage::new(FieldTypes::new());
        let path = std::env::temp_dir().join(format!("absent_{}.json", uuid::Uuid::new_v4()));
        assert!(!seed_if_fresh(&storage, &path, 10).await?);
        assert_eq!(storage.count_reloads().await?, 0);
        Ok(())
    }

    #[test]
    fn rejects_empty_host() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "  ".into();
        assert!(matches!(bind_addr(&cfg), Err(StartupError::InvalidConfig(_))));
    }
}
