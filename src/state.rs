use crate::notify::{AlertQueue, WebhookNotifier};
use crate::storage::{persist_storage, LocalStorage};
use crate::timer::{Clock, TimerEngine};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::error;

/// Everything that lives in "local storage" plus the engine that owns the timer blob.
pub struct StudyData {
    pub storage: LocalStorage,
    pub timer: TimerEngine,
}

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<StudyData>>,
    pub webhook: Arc<WebhookNotifier>,
    pub alerts: Arc<AlertQueue>,
}

impl AppState {
    pub fn new(
        data_path: PathBuf,
        mut storage: LocalStorage,
        clock: Arc<dyn Clock>,
        webhook: Arc<WebhookNotifier>,
        alerts: Arc<AlertQueue>,
    ) -> Self {
        let timer = TimerEngine::restore(&mut storage, clock, webhook.clone(), alerts.clone());
        Self {
            data_path,
            data: Arc::new(Mutex::new(StudyData { storage, timer })),
            webhook,
            alerts,
        }
    }

    /// Flushes storage to disk. Failures are logged; in-memory state stays authoritative.
    pub async fn flush(&self, storage: &LocalStorage) {
        if let Err(err) = persist_storage(&self.data_path, storage).await {
            error!("failed to persist storage: {err}");
        }
    }
}
