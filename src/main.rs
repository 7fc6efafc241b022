use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reminisce_api::api::{create_router, AppState};
use reminisce_api::config::Config;
use reminisce_api::services::bandit::{HubSnapshotSource, SnapshotSource};
use reminisce_api::services::{HierarchicalBandit, ModelStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "reminisce_api=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = ModelStore::new(&config.models_dir)?;
    let hub = config
        .hub_repo()
        .map(|repo| HubSnapshotSource::new(config.hf_hub_url.clone(), repo));
    let bandit = HierarchicalBandit::init(
        store,
        config.bandit_settings(),
        hub.as_ref().map(|source| source as &dyn SnapshotSource),
    )
    .await;
    let bandit = Arc::new(bandit);

    let app = create_router(AppState::new(Arc::clone(&bandit)));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tokio::task::spawn_blocking(move || bandit.close()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
