//! Scheduling backends that hand queued job ids to the dispatcher.
//!
//! A backend only decides *which* job to try next. Whether the job may
//! actually run is settled by the `queued -> processing` compare-and-set in
//! the record store, so a stale or duplicate id is harmless.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scenecast_core::types::DbId;
use scenecast_db::RecordStore;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;

/// FIFO of job ids waiting to be claimed.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Schedule `job_id` behind everything already waiting.
    async fn push(&self, job_id: DbId) -> Result<(), QueueError>;

    /// Wait for the next candidate. Returns `None` once `shutdown` fires.
    async fn next(&self, shutdown: &CancellationToken) -> Result<Option<DbId>, QueueError>;

    /// Drop `job_id` if it is still waiting.
    async fn remove(&self, job_id: DbId) -> Result<(), QueueError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// In-process FIFO
// ---------------------------------------------------------------------------

/// Process-local FIFO. Waiting ids are lost on restart.
#[derive(Default)]
pub struct InProcessQueue {
    ids: Mutex<VecDeque<DbId>>,
    notify: Notify,
}

impl InProcessQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.ids.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.lock().await.is_empty()
    }
}

#[async_trait]
impl WorkQueue for InProcessQueue {
    async fn push(&self, job_id: DbId) -> Result<(), QueueError> {
        self.ids.lock().await.push_back(job_id);
        self.notify.notify_one();
        Ok(())
    }

    async fn next(&self, shutdown: &CancellationToken) -> Result<Option<DbId>, QueueError> {
        loop {
            // Register interest before checking, so a push between the
            // check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(id) = self.ids.lock().await.pop_front() {
                return Ok(Some(id));
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(None),
                _ = notified => {}
            }
        }
    }

    async fn remove(&self, job_id: DbId) -> Result<(), QueueError> {
        self.ids.lock().await.retain(|id| *id != job_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// Durable polling queue
// ---------------------------------------------------------------------------

/// Reads the oldest `queued` row straight from the record store.
///
/// The store itself is the queue, so waiting jobs survive restarts and are
/// visible to every orchestrator sharing the database. `push` only wakes
/// the local dispatcher early instead of waiting for the next poll.
pub struct StorePollingQueue {
    store: Arc<dyn RecordStore>,
    poll_interval: Duration,
    notify: Notify,
}

impl StorePollingQueue {
    pub fn new(store: Arc<dyn RecordStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
            notify: Notify::new(),
        }
    }
}

#[async_trait]
impl WorkQueue for StorePollingQueue {
    async fn push(&self, _job_id: DbId) -> Result<(), QueueError> {
        self.notify.notify_one();
        Ok(())
    }

    async fn next(&self, shutdown: &CancellationToken) -> Result<Option<DbId>, QueueError> {
        loop {
            if shutdown.is_cancelled() {
                return Ok(None);
            }
            if let Some(id) = self.store.next_queued_job().await? {
                return Ok(Some(id));
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(None),
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn remove(&self, _job_id: DbId) -> Result<(), QueueError> {
        // The row's status change takes it out of the queue.
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
