use std::sync::Arc;

use scenecast_db::RecordStore;
use scenecast_events::{Broadcaster, EventBus};
use scenecast_queue::{JobQueue, WorkQueue};
use scenecast_worker::ProcessorRegistry;

use crate::config::ServerConfig;
use crate::storage::{LocalBlobStore, StorageError};
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Video, job and scene rows.
    pub store: Arc<dyn RecordStore>,
    /// The job orchestrator.
    pub queue: JobQueue,
    /// WebSocket connection manager (live-update subscribers).
    pub ws_manager: Arc<WsManager>,
    /// In-process fan-out of live events.
    pub event_bus: Arc<EventBus>,
    /// Uploaded video blobs.
    pub blobs: Arc<LocalBlobStore>,
    pub config: Arc<ServerConfig>,
}

/// Wire the orchestrator, event bus and blob storage around `store` and
/// `work`, using the simulated processors sized by `config`.
pub async fn build_state(
    config: ServerConfig,
    store: Arc<dyn RecordStore>,
    work: Arc<dyn WorkQueue>,
) -> Result<AppState, StorageError> {
    let event_bus = Arc::new(EventBus::default());
    let blobs = Arc::new(LocalBlobStore::new(&config.upload_dir).await?);
    let processors = ProcessorRegistry::simulated(config.simulated_config());

    let queue = JobQueue::new(
        Arc::clone(&store),
        work,
        Arc::clone(&event_bus) as Arc<dyn Broadcaster>,
        processors,
        config.queue_config(),
    );

    Ok(AppState {
        store,
        queue,
        ws_manager: Arc::new(WsManager::new()),
        event_bus,
        blobs,
        config: Arc::new(config),
    })
}
