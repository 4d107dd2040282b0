use super::engine::TickOutcome;
use crate::state::{AppState, StudyData};
use crate::storage::persist_storage;
use std::time::Duration;
use tokio::{task::JoinHandle, time};
use tracing::{error, info};

/// Drives `TimerEngine::tick` once per `period` for the lifetime of the server.
pub fn spawn_ticker(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let mut guard = state.data.lock().await;
            let StudyData { storage, timer } = &mut *guard;
            if !timer.is_running() {
                continue;
            }

            if timer.tick(storage) == TickOutcome::Completed {
                info!("countdown finished");
                if let Err(err) = persist_storage(&state.data_path, storage).await {
                    error!("failed to flush storage after completion: {err}");
                }
            }
        }
    })
}
