use std::{net::SocketAddr, sync::Arc, time::Duration};
use study_assist::{
    load_storage,
    notify::{AlertQueue, WebhookNotifier},
    persist_storage, router,
    state::StudyData,
    timer::{spawn_ticker, SystemClock},
    AppState, Config,
};
use tokio::fs;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    if config.webhook_url.is_none() {
        warn!("SLACK_WEBHOOK_URL not set, remote notifications are disabled");
    }

    let storage = load_storage(&config.data_path, config.storage_quota_bytes).await;
    let state = AppState::new(
        config.data_path.clone(),
        storage,
        Arc::new(SystemClock),
        Arc::new(WebhookNotifier::new(config.webhook_url.clone())),
        Arc::new(AlertQueue::new()),
    );
    {
        let data = state.data.lock().await;
        state.flush(&data.storage).await;
    }

    let ticker = spawn_ticker(state.clone(), Duration::from_secs(1));
    let app = router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.abort();
    suspend(&state).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Leaving is treated like the page going to the background.
async fn suspend(state: &AppState) {
    let mut guard = state.data.lock().await;
    let StudyData { storage, timer } = &mut *guard;
    timer.on_background(storage);
    if let Err(err) = persist_storage(&state.data_path, storage).await {
        error!("failed to persist storage on shutdown: {err}");
    }
}
