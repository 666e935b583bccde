use std::{future::Future, net::SocketAddr, path::Path, sync::Arc};

use axum::Router;
use common::crypto::LinkSigner;
use common::utils::logging::init_logging_from_env;
use dotenvy::dotenv;
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use service::{
    measure::{repo::SeaOrmMeasureRepository, MeasureService, MeasureSettings},
    runtime,
    storage::ImageStore,
    vision::{GeminiMeterReader, MeterReader},
};

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &configs::AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Wire the reading service from configuration, a database and a vision client.
pub fn build_state(cfg: &configs::AppConfig, db: DatabaseConnection, reader: Arc<dyn MeterReader>) -> ServerState {
    let measures = MeasureService::new(
        Arc::new(SeaOrmMeasureRepository::new(db)),
        reader,
        ImageStore::new(&cfg.storage.image_dir),
        LinkSigner::new(cfg.links.secret.as_bytes()),
        MeasureSettings::from_config(cfg),
    );
    ServerState::new(measures)
}

/// Prepare directories and schema, then build the router.
pub async fn build_app(cfg: &configs::AppConfig) -> anyhow::Result<Router> {
    runtime::ensure_env(Path::new(&cfg.storage.image_dir)).await?;

    let db = models::db::connect_with_config(&(&cfg.database).into()).await?;
    migration::Migrator::up(&db, None).await?;

    let reader = GeminiMeterReader::from_config(&cfg.vision)?;
    if !reader.is_configured() {
        warn!("no vision API key configured; uploads will store -1 readings");
    }

    let state = build_state(cfg, db, Arc::new(reader));
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and run the HTTP server until the process ends
pub async fn run() -> anyhow::Result<()> {
    run_until(std::future::pending()).await
}

/// Build the app and serve until `shutdown` resolves, letting in-flight requests finish.
pub async fn run_until<F>(shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    dotenv().ok();
    init_logging_from_env();

    let cfg = configs::AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    info!(%addr, public_base_url = %cfg.server.public_base_url(), "starting meter reader server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server stopped");
    Ok(())
}
