//! Server binary: reads settings, prepares storage, serves the API.

use bass_api::{app, ensure_database_exists, ensure_tables, AppState, MemoryStore, PgStore, Settings, StorageConfig, Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bass_api=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let store: Arc<dyn Store> = match &settings.storage {
        StorageConfig::Postgres { url, max_connections } => {
            ensure_database_exists(url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect(url)
                .await?;
            ensure_tables(&pool).await?;
            tracing::info!("using postgres storage");
            Arc::new(PgStore::new(pool))
        }
        StorageConfig::Memory => {
            tracing::warn!("using in-memory storage; rows are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    if settings.admin_tokens.is_empty() {
        tracing::warn!("ADMIN_TOKENS not set; admin-only operations are unavailable");
    }

    let state = AppState::new(store, settings.admin_tokens.clone());
    let app = app(state, settings.body_limit);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
