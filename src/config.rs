use crate::storage::DEFAULT_QUOTA_BYTES;
use std::{env, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub webhook_url: Option<String>,
    pub storage_quota_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        let data_path = env::var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/storage.json"));

        let webhook_url = env::var("SLACK_WEBHOOK_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let storage_quota_bytes = env::var("STORAGE_QUOTA_BYTES")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_QUOTA_BYTES);

        Self {
            port,
            data_path,
            webhook_url,
            storage_quota_bytes,
        }
    }
}
