pub mod app;
pub mod archive;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod sessions;
pub mod state;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_storage, persist_storage};
