use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

/// Archive uploads carry base64 payloads of up to 5 MiB of file data.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/timer", get(handlers::get_timer))
        .route("/api/timer/start", post(handlers::start_timer))
        .route("/api/timer/pause", post(handlers::pause_timer))
        .route("/api/timer/reset", post(handlers::reset_timer))
        .route("/api/timer/mode", post(handlers::switch_mode))
        .route("/api/timer/task", post(handlers::set_task))
        .route("/api/timer/visibility", post(handlers::visibility))
        .route("/api/sessions", get(handlers::get_sessions))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/tests", get(handlers::list_tests).post(handlers::add_test))
        .route("/api/tests/upcoming", get(handlers::upcoming_tests))
        .route("/api/tests/:id", delete(handlers::delete_test))
        .route("/api/tests/:id/remind", post(handlers::remind_test))
        .route("/api/calendar", get(handlers::get_calendar))
        .route("/api/archives", get(handlers::list_archives).post(handlers::upload_archive))
        .route("/api/archives/:id", delete(handlers::delete_archive))
        .route("/api/archives/:id/download", get(handlers::download_archive))
        .route("/api/alerts", get(handlers::drain_alerts))
        .route("/api/alerts/permission", post(handlers::set_alert_permission))
        .route("/api/theme", get(handlers::get_theme).post(handlers::set_theme))
        .route("/api/theme/toggle", post(handlers::toggle_theme))
        .route("/api/nav", get(handlers::nav_summary))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
