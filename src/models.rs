use crate::timer::{TimerMode, Visibility};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: TimerMode,
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task_name: String,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub state: Visibility,
}

#[derive(Debug, Deserialize)]
pub struct PermissionRequest {
    pub granted: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeBody {
    pub theme: Theme,
}

#[derive(Debug, Serialize)]
pub struct NavSummary {
    pub timer_running: bool,
    pub urgent_test: bool,
    pub archive_count: usize,
}

#[derive(Debug, Serialize)]
pub struct TodayStats {
    pub count: usize,
    pub total_minutes: u32,
    pub tasks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub label: String,
    pub count: usize,
    pub minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct MonthlyStats {
    pub total_count: usize,
    pub total_minutes: u32,
    pub total_hours: u32,
    pub avg_per_day: f64,
}

#[derive(Debug, Serialize)]
pub struct SubjectPoint {
    pub name: String,
    pub count: usize,
    pub minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub today: TodayStats,
    pub last_7_days: Vec<DailyPoint>,
    pub monthly: MonthlyStats,
    pub subjects: Vec<SubjectPoint>,
    pub streak: u32,
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub delivered: bool,
}
