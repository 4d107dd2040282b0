use crate::storage::{LocalStorage, StorageError, SESSIONS_KEY};
use crate::timer::TimerMode;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One finished countdown. Appended on natural completion only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: i64,
    pub task_name: String,
    /// Minutes.
    pub duration: u32,
    #[serde(rename = "type")]
    pub kind: TimerMode,
    pub completed_at: String,
    pub date: String,
}

impl SessionRecord {
    pub fn completed(task_name: &str, mode: TimerMode, at: DateTime<Utc>) -> Self {
        Self {
            id: at.timestamp_millis(),
            task_name: task_name.to_string(),
            duration: mode.preset_minutes(),
            kind: mode,
            completed_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            date: at.with_timezone(&Local).date_naive().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_focus(&self) -> bool {
        self.kind == TimerMode::Work
    }
}

pub fn load_sessions(storage: &LocalStorage) -> Vec<SessionRecord> {
    match storage.get_json::<Vec<SessionRecord>>(SESSIONS_KEY) {
        Ok(sessions) => sessions.unwrap_or_default(),
        Err(err) => {
            warn!("session log is corrupt, treating as empty: {err}");
            Vec::new()
        }
    }
}

pub fn append_session(storage: &mut LocalStorage, mut record: SessionRecord) -> Result<SessionRecord, StorageError> {
    let mut sessions = load_sessions(storage);
    if let Some(last_id) = sessions.iter().map(|s| s.id).max() {
        record.id = record.id.max(last_id + 1);
    }
    sessions.push(record.clone());
    storage.set_json(SESSIONS_KEY, &sessions)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_serializes_with_log_field_names() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let record = SessionRecord::completed("Math", TimerMode::Work, at);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["taskName"], "Math");
        assert_eq!(value["duration"], 25);
        assert_eq!(value["type"], "work");
        assert_eq!(value["completedAt"], "2026-03-01T09:30:00.000Z");
        assert_eq!(value["id"], at.timestamp_millis());
    }

    #[test]
    fn appended_ids_stay_unique() {
        let mut storage = LocalStorage::default();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let first = append_session(&mut storage, SessionRecord::completed("a", TimerMode::Work, at)).unwrap();
        let second = append_session(&mut storage, SessionRecord::completed("b", TimerMode::Break, at)).unwrap();
        assert_eq!(second.id, first.id + 1);
        assert_eq!(load_sessions(&storage).len(), 2);
    }

    #[test]
    fn corrupt_log_reads_as_empty() {
        let mut storage = LocalStorage::default();
        storage.set_item(SESSIONS_KEY, "[{oops".to_string()).unwrap();
        assert!(load_sessions(&storage).is_empty());
    }
}
