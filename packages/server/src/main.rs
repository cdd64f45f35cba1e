use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3::S3ObjectStore;
use common::{StorageAppConfig, StorageBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

use admin_server::config::AppConfig;
use admin_server::state::AppState;
use admin_server::{build_router, database, seed};

async fn build_object_store(config: &StorageAppConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    Ok(match config.backend {
        StorageBackend::Filesystem => {
            info!(path = %config.path.display(), "Using filesystem object store");
            Arc::new(FilesystemObjectStore::new(config.path.clone(), config.max_upload_size).await?)
        }
        StorageBackend::S3 => {
            info!(endpoint = %config.endpoint, bucket = %config.bucket, "Using S3 object store");
            Arc::new(S3ObjectStore::new(config)?)
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("loading configuration")?;

    let db = database::init_db(&config.database)
        .await
        .context("connecting to database")?;
    seed::ensure_indexes(&db).await?;
    seed::seed_superuser(&db, &config.auth).await?;

    let object_store = build_object_store(&config.storage).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("parsing server address")?;

    let state = AppState {
        db,
        config: Arc::new(config),
        object_store,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
