use crate::errors::AppError;
use crate::storage::{LocalStorage, StorageError, TESTS_KEY};
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

const UPCOMING_LIMIT: usize = 5;
const URGENT_WITHIN_DAYS: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTest {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    pub date: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub school: String,
    pub created_at: String,
}

impl ScheduledTest {
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct NewTest {
    pub name: String,
    #[serde(default)]
    pub subject: String,
    pub date: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub school: String,
}

#[derive(Debug, Serialize)]
pub struct CalendarCell {
    pub date: Option<String>,
    pub day: Option<u32>,
    pub is_today: bool,
    pub tests: Vec<ScheduledTest>,
}

#[derive(Debug, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub weekdays: [&'static str; 7],
    pub cells: Vec<CalendarCell>,
}

#[derive(Debug, Serialize)]
pub struct UpcomingTest {
    #[serde(flatten)]
    pub test: ScheduledTest,
    pub days_until: i64,
    pub badge: String,
    pub emoji: &'static str,
}

pub fn load_tests(storage: &LocalStorage) -> Vec<ScheduledTest> {
    match storage.get_json::<Vec<ScheduledTest>>(TESTS_KEY) {
        Ok(tests) => tests.unwrap_or_default(),
        Err(err) => {
            warn!("scheduled tests are corrupt, treating as empty: {err}");
            Vec::new()
        }
    }
}

fn save_tests(storage: &mut LocalStorage, tests: &[ScheduledTest]) -> Result<(), StorageError> {
    if tests.is_empty() {
        storage.remove_item(TESTS_KEY);
        return Ok(());
    }
    storage.set_json(TESTS_KEY, &tests)
}

pub fn add_test(storage: &mut LocalStorage, new_test: NewTest, now: DateTime<Utc>) -> Result<ScheduledTest, AppError> {
    let name = new_test.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("test name is required"));
    }
    let date = new_test.date.trim();
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(AppError::bad_request("date must be YYYY-MM-DD"));
    }

    let mut tests = load_tests(storage);
    let id = tests
        .iter()
        .map(|t| t.id + 1)
        .max()
        .map_or(now.timestamp_millis(), |next| next.max(now.timestamp_millis()));

    let test = ScheduledTest {
        id,
        name: name.to_string(),
        subject: new_test.subject.trim().to_string(),
        date: date.to_string(),
        range: new_test.range.trim().to_string(),
        school: new_test.school.trim().to_string(),
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    tests.push(test.clone());
    save_tests(storage, &tests)?;
    Ok(test)
}

pub fn delete_test(storage: &mut LocalStorage, id: i64) -> Result<(), AppError> {
    let mut tests = load_tests(storage);
    let before = tests.len();
    tests.retain(|t| t.id != id);
    if tests.len() == before {
        return Err(AppError::not_found(format!("test {id} not found")));
    }
    save_tests(storage, &tests)?;
    Ok(())
}

pub fn find_test(storage: &LocalStorage, id: i64) -> Option<ScheduledTest> {
    load_tests(storage).into_iter().find(|t| t.id == id)
}

/// Sunday-first grid: blank leading cells, then one cell per day of the month.
pub fn build_month(year: i32, month: u32, today: NaiveDate, tests: &[ScheduledTest]) -> Option<CalendarMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let leading = first.weekday().num_days_from_sunday() as usize;

    let mut cells: Vec<CalendarCell> = (0..leading)
        .map(|_| CalendarCell {
            date: None,
            day: None,
            is_today: false,
            tests: Vec::new(),
        })
        .collect();

    for date in first.iter_days().take_while(|d| d.month() == month) {
        let key = date.format("%Y-%m-%d").to_string();
        let on_day = tests.iter().filter(|t| t.date == key).cloned().collect();
        cells.push(CalendarCell {
            date: Some(key),
            day: Some(date.day()),
            is_today: date == today,
            tests: on_day,
        });
    }

    Some(CalendarMonth {
        year,
        month,
        weekdays: ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
        cells,
    })
}

pub fn days_until(today: NaiveDate, test: &ScheduledTest) -> Option<i64> {
    test.day().map(|day| (day - today).num_days())
}

pub fn upcoming(today: NaiveDate, tests: &[ScheduledTest]) -> Vec<UpcomingTest> {
    let mut upcoming: Vec<(i64, &ScheduledTest)> = tests
        .iter()
        .filter_map(|t| days_until(today, t).map(|days| (days, t)))
        .filter(|(days, _)| *days >= 0)
        .collect();
    upcoming.sort_by_key(|(days, _)| *days);

    upcoming
        .into_iter()
        .take(UPCOMING_LIMIT)
        .map(|(days, test)| UpcomingTest {
            test: test.clone(),
            days_until: days,
            badge: urgency_badge(days),
            emoji: subject_emoji(&test.subject),
        })
        .collect()
}

pub fn has_urgent(today: NaiveDate, tests: &[ScheduledTest]) -> bool {
    tests
        .iter()
        .filter_map(|t| days_until(today, t))
        .any(|days| (0..=URGENT_WITHIN_DAYS).contains(&days))
}

fn urgency_badge(days: i64) -> String {
    match days {
        0 => "Today!".to_string(),
        1 => "1 day left".to_string(),
        n => format!("{n} days left"),
    }
}

pub fn subject_emoji(subject: &str) -> &'static str {
    match subject {
        "Math" => "📐",
        "English" => "🔤",
        "Japanese" => "📖",
        "Science" => "🔬",
        "Social Studies" => "🌍",
        _ => "📝",
    }
}
