use super::clock::Clock;
use super::state::{AnchorRecord, PersistedTimer, TimerMode, TimerSnapshot, TimerState};
use crate::notify::{LocalNotifier, Notifier, NotifyEvent};
use crate::sessions::{append_session, SessionRecord};
use crate::storage::{LocalStorage, TIMER_STATE_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer is already running")]
    AlreadyRunning,
    #[error("timer is not running")]
    NotRunning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Ticked,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    Idle,
    Anchored,
    Resumed { remaining_seconds: u32 },
    Completed,
}

/// Pomodoro countdown state machine.
///
/// Every external event (tick, visibility change, user action) maps to exactly one
/// method here, and each method rewrites the `timerState` blob through `persist`.
/// Remaining time is re-derived from a wall-clock [`AnchorRecord`] whenever the
/// process may have been suspended, and the completion path fires at most once per
/// run segment.
pub struct TimerEngine {
    state: TimerState,
    anchor: Option<AnchorRecord>,
    completion_fired: bool,
    visibility: Visibility,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    alerts: Arc<dyn LocalNotifier>,
}

impl TimerEngine {
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>, alerts: Arc<dyn LocalNotifier>) -> Self {
        Self {
            state: TimerState::default(),
            anchor: None,
            completion_fired: false,
            visibility: Visibility::Visible,
            clock,
            notifier,
            alerts,
        }
    }

    /// Rebuilds the engine from local storage and reconciles it with the wall clock.
    pub fn restore(
        storage: &mut LocalStorage,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        alerts: Arc<dyn LocalNotifier>,
    ) -> Self {
        let mut engine = Self::new(clock, notifier, alerts);

        match storage.get_json::<PersistedTimer>(TIMER_STATE_KEY) {
            Ok(Some(blob)) => {
                let (state, anchor) = blob.into_state();
                info!(
                    mode = %state.mode,
                    remaining = state.remaining_seconds,
                    running = state.running,
                    "restored timer state"
                );
                engine.state = state;
                engine.anchor = anchor;
            }
            Ok(None) => {}
            Err(err) => {
                warn!("timer state is corrupt, starting fresh: {err}");
                engine.persist(storage);
            }
        }

        engine.on_foreground(storage);
        engine
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn anchor(&self) -> Option<&AnchorRecord> {
        self.anchor.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from_state(&self.state)
    }

    pub fn set_task_label(&mut self, label: &str, storage: &mut LocalStorage) {
        self.state.task_label = label.to_string();
        self.persist(storage);
    }

    pub fn start(&mut self, storage: &mut LocalStorage) -> Result<(), TimerError> {
        if self.state.running {
            return Err(TimerError::AlreadyRunning);
        }

        let preset = self.state.mode.preset_seconds();
        if self.state.remaining_seconds == 0 {
            self.state.remaining_seconds = preset;
        }
        let fresh_focus = self.state.mode == TimerMode::Work && self.state.remaining_seconds == preset;

        self.state.running = true;
        self.state.completed = false;
        self.completion_fired = false;
        self.anchor = Some(AnchorRecord::new(self.clock.now_ms(), self.state.remaining_seconds));
        self.persist(storage);

        info!(
            mode = %self.state.mode,
            remaining = self.state.remaining_seconds,
            "timer started"
        );

        if fresh_focus {
            self.notifier.notify(NotifyEvent::SessionStarted {
                task_name: self.state.task_label.clone(),
            });
        }
        Ok(())
    }

    pub fn pause(&mut self, storage: &mut LocalStorage) -> Result<(), TimerError> {
        if !self.state.running {
            return Err(TimerError::NotRunning);
        }

        self.state.running = false;
        self.anchor = None;
        self.persist(storage);
        info!(remaining = self.state.remaining_seconds, "timer paused");
        Ok(())
    }

    pub fn reset(&mut self, storage: &mut LocalStorage) {
        self.stop_at_preset();
        self.persist(storage);
        info!(mode = %self.state.mode, "timer reset");
    }

    /// Always discards the countdown in progress.
    pub fn switch_mode(&mut self, mode: TimerMode, storage: &mut LocalStorage) {
        self.state.mode = mode;
        self.stop_at_preset();
        self.persist(storage);
        info!(mode = %mode, "timer mode switched");
    }

    pub fn tick(&mut self, storage: &mut LocalStorage) -> TickOutcome {
        if !self.state.running {
            return TickOutcome::Idle;
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            return if self.complete(storage) {
                TickOutcome::Completed
            } else {
                TickOutcome::Idle
            };
        }

        self.persist(storage);
        TickOutcome::Ticked
    }

    pub fn on_visibility(&mut self, visibility: Visibility, storage: &mut LocalStorage) -> ResyncOutcome {
        match visibility {
            Visibility::Hidden => self.on_background(storage),
            Visibility::Visible => self.on_foreground(storage),
        }
    }

    /// Re-anchors at the moment of suspension; ticks may already have drifted.
    pub fn on_background(&mut self, storage: &mut LocalStorage) -> ResyncOutcome {
        self.visibility = Visibility::Hidden;
        if !self.state.running {
            return ResyncOutcome::Idle;
        }

        self.anchor = Some(AnchorRecord::new(self.clock.now_ms(), self.state.remaining_seconds));
        self.persist(storage);
        debug!(remaining = self.state.remaining_seconds, "timer re-anchored on background");
        ResyncOutcome::Anchored
    }

    pub fn on_foreground(&mut self, storage: &mut LocalStorage) -> ResyncOutcome {
        self.visibility = Visibility::Visible;
        if !self.state.running {
            return ResyncOutcome::Idle;
        }

        let Some(anchor) = self.anchor.or_else(|| persisted_anchor(storage)) else {
            warn!("running timer had no anchor, re-anchoring now");
            self.anchor = Some(AnchorRecord::new(self.clock.now_ms(), self.state.remaining_seconds));
            self.persist(storage);
            return ResyncOutcome::Anchored;
        };

        let true_remaining = anchor.remaining_at(self.clock.now_ms());
        if true_remaining <= 0 {
            self.state.remaining_seconds = 0;
            return if self.complete(storage) {
                ResyncOutcome::Completed
            } else {
                ResyncOutcome::Idle
            };
        }

        let remaining_seconds = u32::try_from(true_remaining).unwrap_or(anchor.remaining_at_start);
        self.state.remaining_seconds = remaining_seconds;
        self.anchor = Some(anchor);
        self.persist(storage);
        debug!(remaining = remaining_seconds, "timer resynchronized on foreground");
        ResyncOutcome::Resumed { remaining_seconds }
    }

    fn stop_at_preset(&mut self) {
        self.state.running = false;
        self.state.completed = false;
        self.state.remaining_seconds = self.state.mode.preset_seconds();
        self.anchor = None;
    }

    /// Natural completion. Returns false when this run segment already completed.
    fn complete(&mut self, storage: &mut LocalStorage) -> bool {
        if self.completion_fired {
            debug!("completion already handled for this run");
            return false;
        }
        self.completion_fired = true;

        let mode = self.state.mode;
        self.state.running = false;
        self.state.remaining_seconds = 0;
        self.state.completed = true;
        self.anchor = None;
        self.persist(storage);

        let record = SessionRecord::completed(&self.state.task_label, mode, self.clock.now());
        match append_session(storage, record) {
            Ok(record) => info!(
                id = record.id,
                kind = %record.kind,
                duration = record.duration,
                "session recorded"
            ),
            Err(err) => error!("failed to record session: {err}"),
        }

        let body = match mode {
            TimerMode::Work => "Nice work. Time for a break.",
            TimerMode::Break => "Break is over. Ready to focus?",
        };
        if let Err(err) = self.alerts.show("Pomodoro complete!", body) {
            debug!("local notification skipped: {err}");
        }

        if mode == TimerMode::Work {
            self.notifier.notify(NotifyEvent::SessionCompleted {
                task_name: self.state.task_label.clone(),
                duration_minutes: mode.preset_minutes(),
            });
        }
        true
    }

    fn persist(&self, storage: &mut LocalStorage) {
        let blob = PersistedTimer::capture(&self.state, self.anchor.as_ref());
        if let Err(err) = storage.set_json(TIMER_STATE_KEY, &blob) {
            error!("failed to persist timer state: {err}");
        }
    }
}

fn persisted_anchor(storage: &LocalStorage) -> Option<AnchorRecord> {
    storage
        .get_json::<PersistedTimer>(TIMER_STATE_KEY)
        .ok()
        .flatten()
        .and_then(|blob| blob.anchor())
}
