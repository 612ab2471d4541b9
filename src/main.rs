use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use podcast_console::app;
use podcast_console::config::settings::{AppConfig, HostBackend};
use podcast_console::infrastructure::db::pool::connect_to_db;
use podcast_console::infrastructure::podcast_host::{BuzzsproutClient, InMemoryHost, PodcastHost};
use podcast_console::infrastructure::storage::local::UploadStorage;
use podcast_console::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("podcast_console=info,tower_http=info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("JWT_SECRET must be set")?;

    let db = connect_to_db(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to open database")?;

    let storage = UploadStorage::new(&config.upload_folder)
        .await
        .with_context(|| format!("Failed to prepare {}", config.upload_folder.display()))?;

    let host: Arc<dyn PodcastHost> = match config.podcast_host {
        HostBackend::Buzzsprout => Arc::new(BuzzsproutClient::new(config.buzzsprout_api_url.clone())),
        HostBackend::Memory => {
            info!("Podcast host: in-memory, nothing leaves this process");
            Arc::new(InMemoryHost::open())
        }
    };

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState::new(config, db, host, storage);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
