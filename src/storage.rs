use serde::{de::DeserializeOwned, Serialize};
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;
use tokio::fs;
use tracing::error;

pub const TIMER_STATE_KEY: &str = "timerState";
pub const SESSIONS_KEY: &str = "pomodoroSessions";
pub const TESTS_KEY: &str = "scheduledTests";
pub const ARCHIVES_KEY: &str = "testArchives";
pub const THEME_KEY: &str = "theme";

/// Same budget browsers give a single origin's local storage.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write storage file: {0}")]
    Io(#[from] std::io::Error),
}

/// String key/value store with a byte quota, mirroring browser local storage.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    items: BTreeMap<String, String>,
    quota_bytes: usize,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_BYTES)
    }
}

impl LocalStorage {
    pub fn new(quota_bytes: usize) -> Self {
        Self::with_items(BTreeMap::new(), quota_bytes)
    }

    pub fn with_items(items: BTreeMap<String, String>, quota_bytes: usize) -> Self {
        Self { items, quota_bytes }
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let existing = self
            .items
            .get(key)
            .map_or(0, |old| key.len() + old.len());
        let needed = self.used_bytes() - existing + key.len() + value.len();
        if needed > self.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed,
                quota: self.quota_bytes,
            });
        }

        self.items.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove_item(&mut self, key: &str) -> Option<String> {
        self.items.remove(key)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.get_item(key).map(serde_json::from_str).transpose()
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let payload = serde_json::to_string(value)?;
        self.set_item(key, payload)
    }

    pub fn used_bytes(&self) -> usize {
        self.items
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }

    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }
}

pub async fn load_storage(path: &Path, quota_bytes: usize) -> LocalStorage {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
            Ok(items) => LocalStorage::with_items(items, quota_bytes),
            Err(err) => {
                error!("failed to parse storage file: {err}");
                LocalStorage::new(quota_bytes)
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => LocalStorage::new(quota_bytes),
        Err(err) => {
            error!("failed to read storage file: {err}");
            LocalStorage::new(quota_bytes)
        }
    }
}

pub async fn persist_storage(path: &Path, storage: &LocalStorage) -> Result<(), StorageError> {
    let payload = serde_json::to_vec_pretty(&storage.items)?;
    fs::write(path, payload).await?;
    Ok(())
}
