use std::sync::Arc;

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::{MemoryStore, Store};
use crate::mail;

pub async fn handle(config: AppConfig, memory: bool) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = if memory {
        tracing::warn!("Using the in-memory store; nothing survives a restart");
        Arc::new(MemoryStore::new())
    } else {
        let store = crate::cli::open_store(&config).await?;
        store.migrate().await?;
        store
    };
    let mailer = mail::from_config(&config.mail);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    tracing::info!("Starting dapi in {:?} mode", config.environment);
    let app = router(AppState::new(store, mailer, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;
    tracing::info!("dapi listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
