use serde::{Deserialize, Serialize};
use std::fmt;

pub const FOCUS_SECONDS: u32 = 25 * 60;
pub const BREAK_SECONDS: u32 = 5 * 60;
pub const DEFAULT_TASK_LABEL: &str = "Study";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    Work,
    Break,
}

impl TimerMode {
    pub fn preset_seconds(self) -> u32 {
        match self {
            TimerMode::Work => FOCUS_SECONDS,
            TimerMode::Break => BREAK_SECONDS,
        }
    }

    pub fn preset_minutes(self) -> u32 {
        self.preset_seconds() / 60
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub remaining_seconds: u32,
    pub running: bool,
    pub mode: TimerMode,
    pub task_label: String,
    /// Set between a countdown reaching zero and the next start, reset or mode switch.
    pub completed: bool,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            remaining_seconds: FOCUS_SECONDS,
            running: false,
            mode: TimerMode::Work,
            task_label: DEFAULT_TASK_LABEL.to_string(),
            completed: false,
        }
    }
}

/// Wall-clock reference for the current run segment. Only exists while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRecord {
    pub start_timestamp_ms: i64,
    pub remaining_at_start: u32,
}

impl AnchorRecord {
    pub fn new(start_timestamp_ms: i64, remaining_at_start: u32) -> Self {
        Self {
            start_timestamp_ms,
            remaining_at_start,
        }
    }

    pub fn elapsed_secs(&self, now_ms: i64) -> i64 {
        // a clock that stepped backwards counts as no time passed
        (now_ms - self.start_timestamp_ms).max(0) / 1000
    }

    /// Seconds left at `now_ms`; zero or negative once the segment has run out.
    pub fn remaining_at(&self, now_ms: i64) -> i64 {
        i64::from(self.remaining_at_start) - self.elapsed_secs(now_ms)
    }
}

/// The `timerState` blob as it sits in local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimer {
    pub time_left: u32,
    pub is_active: bool,
    pub mode: TimerMode,
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_time_left: Option<u32>,
}

impl PersistedTimer {
    pub fn capture(state: &TimerState, anchor: Option<&AnchorRecord>) -> Self {
        let anchor = anchor.filter(|_| state.running);
        Self {
            time_left: state.remaining_seconds,
            is_active: anchor.is_some(),
            mode: state.mode,
            task_name: state.task_label.clone(),
            start_time: anchor.map(|a| a.start_timestamp_ms),
            initial_time_left: anchor.map(|a| a.remaining_at_start),
        }
    }

    pub fn anchor(&self) -> Option<AnchorRecord> {
        if !self.is_active {
            return None;
        }
        match (self.start_time, self.initial_time_left) {
            (Some(start), Some(initial)) => Some(AnchorRecord::new(start, initial.min(self.mode.preset_seconds()))),
            _ => None,
        }
    }

    /// Rebuilds in-memory state. An active blob without a usable anchor comes back paused.
    pub fn into_state(self) -> (TimerState, Option<AnchorRecord>) {
        let anchor = self.anchor();
        let remaining_seconds = self.time_left.min(self.mode.preset_seconds());
        let state = TimerState {
            remaining_seconds,
            running: anchor.is_some(),
            mode: self.mode,
            task_label: self.task_name,
            completed: anchor.is_none() && remaining_seconds == 0,
        };
        (state, anchor)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimerSnapshot {
    pub remaining_seconds: u32,
    pub running: bool,
    pub mode: TimerMode,
    pub task_label: String,
    pub completed: bool,
    pub preset_seconds: u32,
    pub display: String,
    pub progress_percent: f64,
}

impl TimerSnapshot {
    pub fn from_state(state: &TimerState) -> Self {
        let preset = state.mode.preset_seconds();
        let done = preset.saturating_sub(state.remaining_seconds);
        Self {
            remaining_seconds: state.remaining_seconds,
            running: state.running,
            mode: state.mode,
            task_label: state.task_label.clone(),
            completed: state.completed,
            preset_seconds: preset,
            display: format_clock(state.remaining_seconds),
            progress_percent: f64::from(done) * 100.0 / f64::from(preset),
        }
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_floors_partial_seconds() {
        let anchor = AnchorRecord::new(10_000, 100);
        assert_eq!(anchor.remaining_at(10_999), 100);
        assert_eq!(anchor.remaining_at(11_000), 99);
        assert_eq!(anchor.remaining_at(210_000), -100);
        assert_eq!(anchor.remaining_at(5_000), 100);
    }

    #[test]
    fn persisted_blob_uses_storage_field_names() {
        let state = TimerState {
            remaining_seconds: 1490,
            running: true,
            ..TimerState::default()
        };
        let anchor = AnchorRecord::new(1_700_000_000_000, 1500);
        let value = serde_json::to_value(PersistedTimer::capture(&state, Some(&anchor))).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "timeLeft": 1490,
                "isActive": true,
                "mode": "work",
                "taskName": "Study",
                "startTime": 1_700_000_000_000_i64,
                "initialTimeLeft": 1500
            })
        );
    }

    #[test]
    fn inactive_blob_omits_anchor_fields() {
        let value = serde_json::to_value(PersistedTimer::capture(&TimerState::default(), None)).unwrap();
        assert!(value.get("startTime").is_none());
        assert!(value.get("initialTimeLeft").is_none());
        assert_eq!(value["isActive"], false);
    }

    #[test]
    fn active_blob_without_anchor_restores_paused() {
        let blob: PersistedTimer = serde_json::from_str(
            r#"{"timeLeft":9000,"isActive":true,"mode":"break","taskName":"x"}"#,
        )
        .unwrap();
        let (state, anchor) = blob.into_state();
        assert!(anchor.is_none());
        assert!(!state.running);
        assert_eq!(state.remaining_seconds, BREAK_SECONDS);
    }

    #[test]
    fn snapshot_formats_minutes_and_progress() {
        let state = TimerState {
            remaining_seconds: 750,
            ..TimerState::default()
        };
        let snapshot = TimerSnapshot::from_state(&state);
        assert_eq!(snapshot.display, "12:30");
        assert!((snapshot.progress_percent - 50.0).abs() < f64::EPSILON);
    }
}
