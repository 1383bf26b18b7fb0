use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenecast_api::config::{LogFormat, QueueBackend, ServerConfig};
use scenecast_api::router::build_app_router;
use scenecast_api::state::build_state;
use scenecast_api::ws;
use scenecast_db::{MemoryStore, PgStore, RecordStore};
use scenecast_queue::{InProcessQueue, StorePollingQueue, WorkQueue};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "scenecast_api=debug,scenecast_queue=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Build the record store and work queue for the configured backend.
async fn connect_backend(
    config: &ServerConfig,
) -> Result<(Arc<dyn RecordStore>, Arc<dyn WorkQueue>), BoxError> {
    match config.queue_backend {
        QueueBackend::Memory => {
            tracing::warn!("Using the in-memory backend; jobs and videos are lost on restart");
            let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
            let work: Arc<dyn WorkQueue> = Arc::new(InProcessQueue::new());
            Ok((store, work))
        }
        QueueBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL must be set for the postgres backend")?;

            let pool = scenecast_db::create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            scenecast_db::health_check(&pool).await?;
            tracing::info!("Database health check passed");

            scenecast_db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(pool));
            let work: Arc<dyn WorkQueue> = Arc::new(StorePollingQueue::new(
                Arc::clone(&store),
                Duration::from_millis(config.poll_interval_ms),
            ));
            Ok((store, work))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(
        host = %config.host,
        port = config.port,
        backend = ?config.queue_backend,
        max_concurrency = config.max_concurrency,
        "Loaded server configuration",
    );

    // --- Storage ---
    let (store, work) = connect_backend(&config).await?;
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs);

    // --- App state ---
    let state = build_state(config, store, work).await?;
    let shutdown = CancellationToken::new();

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(
        Arc::clone(&state.ws_manager),
        heartbeat_interval,
        shutdown.clone(),
    );

    // --- Live event forwarding ---
    let forwarder_stop = CancellationToken::new();
    let forwarder_handle = tokio::spawn(ws::forward_events(
        state.event_bus.subscribe(),
        Arc::clone(&state.ws_manager),
        forwarder_stop.clone(),
    ));

    // --- Job queue ---
    let dispatcher_handle = state.queue.start(shutdown.clone()).await?;
    tracing::info!("Job queue started");

    // --- Start server ---
    let app = build_app_router(state.clone());
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Open WebSocket connections would hold the server open, so jobs are
    // settled and subscribers closed before axum waits on connections.
    let cleanup = {
        let state = state.clone();
        async move {
            shutdown_signal().await;

            // Stops the dispatcher and cancels every in-flight job.
            shutdown.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

            if state.queue.drain(shutdown_timeout).await {
                tracing::info!("In-flight jobs settled");
            }

            // The forwarder relays the final job events before exiting.
            forwarder_stop.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(5), forwarder_handle).await;

            let ws_count = state.ws_manager.connection_count().await;
            tracing::info!(ws_count, "Closing remaining WebSocket connections");
            state.ws_manager.shutdown_all().await;

            heartbeat_handle.abort();
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(cleanup)
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
