use reqwest::Client;
use serde::Serialize;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

const ALERT_QUEUE_LIMIT: usize = 16;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook URL is not configured")]
    NotConfigured,
    #[error("notification permission has not been granted")]
    PermissionDenied,
    #[error("no async runtime available to dispatch notification")]
    NoRuntime,
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    SessionStarted {
        task_name: String,
    },
    SessionCompleted {
        task_name: String,
        duration_minutes: u32,
    },
    TestReminder {
        name: String,
        subject: String,
        date: String,
        range: String,
        days_until: i64,
    },
}

impl NotifyEvent {
    pub fn message(&self) -> String {
        match self {
            NotifyEvent::SessionStarted { task_name } => {
                format!("🍅 Pomodoro started: focusing on *{task_name}*!")
            }
            NotifyEvent::SessionCompleted {
                task_name,
                duration_minutes,
            } => format!(
                "✅ Pomodoro complete: *{task_name}* ({duration_minutes} min) done! Time for a break ☕"
            ),
            NotifyEvent::TestReminder {
                name,
                subject,
                date,
                range,
                days_until,
            } => {
                let when = if *days_until == 0 {
                    "today".to_string()
                } else {
                    format!("in {days_until} days")
                };
                let range = if range.trim().is_empty() { "TBD" } else { range.as_str() };
                format!(
                    "🔔 *Test reminder*: {name} ({subject}) is {when}!\n📅 Date: {date}\n📚 Range: {range}"
                )
            }
        }
    }
}

/// Remote notification sink. Implementations must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotifyEvent);
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|err| {
                warn!("falling back to default http client: {err}");
                Client::new()
            });
        Self {
            client,
            webhook_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let url = self.webhook_url.as_deref().ok_or(NotifyError::NotConfigured)?;

        let response = self
            .client
            .post(url)
            .json(&WebhookPayload { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("webhook message delivered");
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: NotifyEvent) {
        if !self.is_configured() {
            warn!("skipping notification, {}", NotifyError::NotConfigured);
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                error!("{}", NotifyError::NoRuntime);
                return;
            }
        };

        let notifier = self.clone();
        runtime.spawn(async move {
            if let Err(err) = notifier.send_message(&event.message()).await {
                error!("failed to send notification: {err}");
            }
        });
    }
}

/// End-user notification shown on the device running the page.
pub trait LocalNotifier: Send + Sync {
    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

/// Alerts waiting for the page to display them.
#[derive(Debug, Default)]
pub struct AlertQueue {
    permission_granted: AtomicBool,
    pending: Mutex<VecDeque<Alert>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
        if !granted {
            self.drain();
        }
    }

    pub fn permission_granted(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    pub fn drain(&self) -> Vec<Alert> {
        match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl LocalNotifier for AlertQueue {
    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if !self.permission_granted() {
            return Err(NotifyError::PermissionDenied);
        }

        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        if pending.len() >= ALERT_QUEUE_LIMIT {
            pending.pop_front();
            debug!("alert queue full, dropped oldest alert");
        }
        pending.push_back(Alert {
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
