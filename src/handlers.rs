use crate::archive::{self, ArchiveFilter, ArchiveSummary, UploadRequest};
use crate::calendar::{self, CalendarMonth, NewTest, ScheduledTest, UpcomingTest};
use crate::errors::AppError;
use crate::models::{
    DeliveryResponse, ModeRequest, NavSummary, PermissionRequest, StatsResponse, TaskRequest, Theme,
    ThemeBody, VisibilityRequest,
};
use crate::notify::{Alert, NotifyEvent};
use crate::sessions::{load_sessions, SessionRecord};
use crate::state::{AppState, StudyData};
use crate::stats::build_stats;
use crate::storage::{persist_storage, LocalStorage, THEME_KEY};
use crate::timer::{TimerEngine, TimerError, TimerSnapshot};
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{Datelike, Local, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let data = state.data.lock().await;
    Html(render_index(&data.timer.snapshot(), load_theme(&data.storage)))
}

pub async fn get_timer(State(state): State<AppState>) -> Json<TimerSnapshot> {
    let data = state.data.lock().await;
    Json(data.timer.snapshot())
}

pub async fn start_timer(State(state): State<AppState>) -> Result<Json<TimerSnapshot>, AppError> {
    apply_timer(&state, |timer, storage| timer.start(storage)).await
}

pub async fn pause_timer(State(state): State<AppState>) -> Result<Json<TimerSnapshot>, AppError> {
    apply_timer(&state, |timer, storage| timer.pause(storage)).await
}

pub async fn reset_timer(State(state): State<AppState>) -> Result<Json<TimerSnapshot>, AppError> {
    apply_timer(&state, |timer, storage| {
        timer.reset(storage);
        Ok(())
    })
    .await
}

pub async fn switch_mode(
    State(state): State<AppState>,
    Json(payload): Json<ModeRequest>,
) -> Result<Json<TimerSnapshot>, AppError> {
    apply_timer(&state, |timer, storage| {
        timer.switch_mode(payload.mode, storage);
        Ok(())
    })
    .await
}

pub async fn set_task(
    State(state): State<AppState>,
    Json(payload): Json<TaskRequest>,
) -> Result<Json<TimerSnapshot>, AppError> {
    apply_timer(&state, |timer, storage| {
        timer.set_task_label(payload.task_name.trim(), storage);
        Ok(())
    })
    .await
}

pub async fn visibility(
    State(state): State<AppState>,
    Json(payload): Json<VisibilityRequest>,
) -> Result<Json<TimerSnapshot>, AppError> {
    apply_timer(&state, |timer, storage| {
        let outcome = timer.on_visibility(payload.state, storage);
        info!(state = ?payload.state, ?outcome, "visibility changed");
        Ok(())
    })
    .await
}

/// Runs one engine transition under the lock, then flushes storage.
/// Flush failures are logged by `AppState::flush` and never fail the request.
async fn apply_timer<F>(state: &AppState, apply: F) -> Result<Json<TimerSnapshot>, AppError>
where
    F: FnOnce(&mut TimerEngine, &mut LocalStorage) -> Result<(), TimerError>,
{
    let mut guard = state.data.lock().await;
    let StudyData { storage, timer } = &mut *guard;
    apply(timer, storage)?;
    let snapshot = timer.snapshot();
    state.flush(storage).await;
    Ok(Json(snapshot))
}

pub async fn get_sessions(State(state): State<AppState>) -> Json<Vec<SessionRecord>> {
    let data = state.data.lock().await;
    Json(load_sessions(&data.storage))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let data = state.data.lock().await;
    Json(build_stats(&load_sessions(&data.storage)))
}

pub async fn list_tests(State(state): State<AppState>) -> Json<Vec<ScheduledTest>> {
    let data = state.data.lock().await;
    Json(calendar::load_tests(&data.storage))
}

pub async fn add_test(
    State(state): State<AppState>,
    Json(payload): Json<NewTest>,
) -> Result<(StatusCode, Json<ScheduledTest>), AppError> {
    let mut data = state.data.lock().await;
    let test = calendar::add_test(&mut data.storage, payload, Utc::now())?;
    persist_storage(&state.data_path, &data.storage).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

pub async fn delete_test(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    calendar::delete_test(&mut data.storage, id)?;
    persist_storage(&state.data_path, &data.storage).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remind_test(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let test = {
        let data = state.data.lock().await;
        calendar::find_test(&data.storage, id).ok_or_else(|| AppError::not_found(format!("test {id} not found")))?
    };

    let event = NotifyEvent::TestReminder {
        days_until: calendar::days_until(today(), &test).unwrap_or_default(),
        name: test.name,
        subject: test.subject,
        date: test.date,
        range: test.range,
    };
    state.webhook.send_message(&event.message()).await?;
    Ok(Json(DeliveryResponse { delivered: true }))
}

pub async fn upcoming_tests(State(state): State<AppState>) -> Json<Vec<UpcomingTest>> {
    let data = state.data.lock().await;
    Json(calendar::upcoming(today(), &calendar::load_tests(&data.storage)))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarMonth>, AppError> {
    let today = today();
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());

    let data = state.data.lock().await;
    let tests = calendar::load_tests(&data.storage);
    calendar::build_month(year, month, today, &tests)
        .map(Json)
        .ok_or_else(|| AppError::bad_request("month must be between 1 and 12"))
}

pub async fn list_archives(
    State(state): State<AppState>,
    Query(filter): Query<ArchiveFilter>,
) -> Json<Vec<ArchiveSummary>> {
    let data = state.data.lock().await;
    Json(archive::list_archives(&data.storage, &filter))
}

pub async fn upload_archive(
    State(state): State<AppState>,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<ArchiveSummary>), AppError> {
    let entry = archive::prepare_upload(payload, Utc::now())?;

    let mut data = state.data.lock().await;
    let summary = archive::add_archive(&mut data.storage, entry)?;
    persist_storage(&state.data_path, &data.storage).await?;
    info!(id = summary.id, file = %summary.file_name, "archive stored");
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn delete_archive(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    if !archive::delete_archive(&mut data.storage, id)? {
        return Err(AppError::not_found(format!("archive {id} not found")));
    }
    persist_storage(&state.data_path, &data.storage).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_archive(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    let entry = {
        let data = state.data.lock().await;
        archive::find_archive(&data.storage, id).ok_or_else(|| AppError::not_found(format!("archive {id} not found")))?
    };

    let file = archive::decode_data_url(&entry.file_data)?;
    let file_name = entry.file_name.replace(['"', '\\', '\r', '\n'], "_");
    let headers = [
        (header::CONTENT_TYPE, file.mime),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
    ];
    Ok((headers, file.bytes).into_response())
}

pub async fn drain_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    Json(state.alerts.drain())
}

pub async fn set_alert_permission(
    State(state): State<AppState>,
    Json(payload): Json<PermissionRequest>,
) -> StatusCode {
    state.alerts.set_permission(payload.granted);
    StatusCode::NO_CONTENT
}

pub async fn get_theme(State(state): State<AppState>) -> Json<ThemeBody> {
    let data = state.data.lock().await;
    Json(ThemeBody {
        theme: load_theme(&data.storage),
    })
}

pub async fn set_theme(
    State(state): State<AppState>,
    Json(payload): Json<ThemeBody>,
) -> Result<Json<ThemeBody>, AppError> {
    store_theme(&state, |_| payload.theme).await
}

pub async fn toggle_theme(State(state): State<AppState>) -> Result<Json<ThemeBody>, AppError> {
    store_theme(&state, Theme::toggled).await
}

async fn store_theme(state: &AppState, next: impl FnOnce(Theme) -> Theme) -> Result<Json<ThemeBody>, AppError> {
    let mut data = state.data.lock().await;
    let theme = next(load_theme(&data.storage));
    data.storage.set_json(THEME_KEY, &theme)?;
    persist_storage(&state.data_path, &data.storage).await?;
    Ok(Json(ThemeBody { theme }))
}

pub async fn nav_summary(State(state): State<AppState>) -> Json<NavSummary> {
    let data = state.data.lock().await;
    Json(NavSummary {
        timer_running: data.timer.is_running(),
        urgent_test: calendar::has_urgent(today(), &calendar::load_tests(&data.storage)),
        archive_count: archive::archive_count(&data.storage),
    })
}

fn load_theme(storage: &LocalStorage) -> Theme {
    storage.get_json(THEME_KEY).ok().flatten().unwrap_or_default()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
