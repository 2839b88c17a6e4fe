use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zeus_recorder::config::Config;
use zeus_recorder::routes;
use zeus_recorder::services::{
    cleanup::{run_startup_recovery, start_cleanup_task, CleanupConfig},
    HttpStreamSource, LogNotifier, Notifier, RecordingEngine, RecordingStore, Scheduler,
    WebhookNotifier,
};
use zeus_recorder::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zeus_recorder=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting Zeus Recorder v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app_env);

    // Persistent store
    let store = RecordingStore::open(&config.data_dir).await?;
    tracing::info!("Recording store opened: {}", config.data_dir.display());

    // Stream source and notifications
    let source = Arc::new(HttpStreamSource::new(
        &config.user_agent,
        config.stream_connect_timeout_ms,
    )?);
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!("Notifications via webhook: {}", url);
            Arc::new(WebhookNotifier::new(url)?)
        }
        None => Arc::new(LogNotifier),
    };

    let engine = RecordingEngine::new(
        store,
        source,
        notifier,
        &config.recordings_dir,
        Duration::from_millis(config.progress_persist_interval_ms),
    );
    tracing::info!("Recordings directory: {}", config.recordings_dir.display());

    let scheduler = Scheduler::new(
        engine.clone(),
        chrono::Duration::seconds(config.stale_grace_secs),
    );

    // Fail orphaned captures and re-arm schedules before serving
    run_startup_recovery(&scheduler).await?;

    // Start retention task (runs in background)
    if let Some(retention_days) = config.recording_retention_days {
        tokio::spawn(start_cleanup_task(
            engine.clone(),
            CleanupConfig {
                interval_secs: config.cleanup_interval_secs,
                retention_days,
            },
        ));
        tracing::info!("Cleanup task started (retention: {} days)", retention_days);
    }

    // Build application state
    let state = Arc::new(AppState {
        config,
        engine,
        scheduler,
        start_time: Instant::now(),
    });

    let app = routes::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
