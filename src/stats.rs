use crate::models::{DailyPoint, MonthlyStats, StatsResponse, SubjectPoint, TodayStats};
use crate::sessions::SessionRecord;
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

const UNNAMED_TASK: &str = "Other";

pub fn build_stats(sessions: &[SessionRecord]) -> StatsResponse {
    build_stats_at(Local::now().date_naive(), sessions)
}

/// Only focus sessions count toward statistics.
pub fn build_stats_at(today: NaiveDate, sessions: &[SessionRecord]) -> StatsResponse {
    let focus: Vec<&SessionRecord> = sessions.iter().filter(|s| s.is_focus()).collect();

    let mut by_day: BTreeMap<&str, (usize, u32)> = BTreeMap::new();
    for session in &focus {
        let entry = by_day.entry(session.date.as_str()).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(session.duration);
    }
    let day_totals = |date: NaiveDate| by_day.get(date_key(date).as_str()).copied().unwrap_or_default();

    let today_key = date_key(today);
    let mut tasks: Vec<String> = Vec::new();
    for session in focus.iter().filter(|s| s.date == today_key) {
        if !tasks.contains(&session.task_name) {
            tasks.push(session.task_name.clone());
        }
    }
    let (today_count, today_minutes) = day_totals(today);

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset);
        let (count, minutes) = day_totals(date);
        last_7_days.push(DailyPoint {
            date: date_key(date),
            label: date.format("%a").to_string(),
            count,
            minutes,
        });
    }

    let (month_count, month_minutes) = focus
        .iter()
        .filter(|s| {
            parse_date(&s.date).is_some_and(|d| d.year() == today.year() && d.month() == today.month())
        })
        .fold((0usize, 0u32), |(count, minutes), s| {
            (count + 1, minutes.saturating_add(s.duration))
        });
    let avg_per_day = (month_count as f64 / f64::from(today.day()) * 10.0).round() / 10.0;

    StatsResponse {
        today: TodayStats {
            count: today_count,
            total_minutes: today_minutes,
            tasks,
        },
        last_7_days,
        monthly: MonthlyStats {
            total_count: month_count,
            total_minutes: month_minutes,
            total_hours: month_minutes / 60,
            avg_per_day,
        },
        subjects: subject_totals(&focus),
        streak: streak_at(today, &focus),
    }
}

fn subject_totals(focus: &[&SessionRecord]) -> Vec<SubjectPoint> {
    let mut totals: BTreeMap<&str, (usize, u32)> = BTreeMap::new();
    for session in focus {
        let name = match session.task_name.trim() {
            "" => UNNAMED_TASK,
            name => name,
        };
        let entry = totals.entry(name).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(session.duration);
    }

    let mut subjects: Vec<SubjectPoint> = totals
        .into_iter()
        .map(|(name, (count, minutes))| SubjectPoint {
            name: name.to_string(),
            count,
            minutes,
        })
        .collect();
    subjects.sort_by(|a, b| b.count.cmp(&a.count));
    subjects
}

/// Consecutive study days ending today, or ending yesterday if nothing was done today yet.
fn streak_at(today: NaiveDate, focus: &[&SessionRecord]) -> u32 {
    let days: BTreeSet<NaiveDate> = focus.iter().filter_map(|s| parse_date(&s.date)).collect();

    let mut current = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&current) {
        streak += 1;
        current -= Duration::days(1);
    }
    streak
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerMode;

    fn session(date: NaiveDate, task: &str, kind: TimerMode) -> SessionRecord {
        SessionRecord {
            id: 0,
            task_name: task.to_string(),
            duration: kind.preset_minutes(),
            kind,
            completed_at: format!("{date}T10:00:00.000Z"),
            date: date.to_string(),
        }
    }

    #[test]
    fn stats_last_7_days_includes_each_day() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let two_days_ago = today - Duration::days(2);
        let sessions = vec![
            session(two_days_ago, "Math", TimerMode::Work),
            session(two_days_ago, "Math", TimerMode::Work),
            session(two_days_ago, "", TimerMode::Break),
        ];

        let stats = build_stats_at(today, &sessions);
        assert_eq!(stats.last_7_days.len(), 7);
        let point = stats
            .last_7_days
            .iter()
            .find(|day| day.date == two_days_ago.to_string())
            .expect("missing day");
        assert_eq!(point.count, 2);
        assert_eq!(point.minutes, 50);
        assert_eq!(point.label, "Sat");
    }

    #[test]
    fn today_lists_distinct_tasks_in_order() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let sessions = vec![
            session(today, "English", TimerMode::Work),
            session(today, "Math", TimerMode::Work),
            session(today, "English", TimerMode::Work),
            session(today, "Rest", TimerMode::Break),
        ];

        let stats = build_stats_at(today, &sessions);
        assert_eq!(stats.today.count, 3);
        assert_eq!(stats.today.total_minutes, 75);
        assert_eq!(stats.today.tasks, vec!["English", "Math"]);
    }

    #[test]
    fn monthly_average_covers_elapsed_days() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let last_month = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let sessions = vec![
            session(today, "Math", TimerMode::Work),
            session(today - Duration::days(1), "Math", TimerMode::Work),
            session(last_month, "Math", TimerMode::Work),
        ];

        let stats = build_stats_at(today, &sessions);
        assert_eq!(stats.monthly.total_count, 2);
        assert_eq!(stats.monthly.total_minutes, 50);
        assert_eq!(stats.monthly.total_hours, 0);
        assert!((stats.monthly.avg_per_day - 0.7).abs() < 1e-9);
    }

    #[test]
    fn subjects_sorted_by_count_with_blank_as_other() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let sessions = vec![
            session(today, "", TimerMode::Work),
            session(today, "Science", TimerMode::Work),
            session(today, "Science", TimerMode::Work),
        ];

        let stats = build_stats_at(today, &sessions);
        assert_eq!(stats.subjects[0].name, "Science");
        assert_eq!(stats.subjects[0].count, 2);
        assert_eq!(stats.subjects[1].name, "Other");
    }

    #[test]
    fn streak_counts_back_from_today_or_yesterday() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        let day = |n: i64| today - Duration::days(n);

        let with_today = vec![
            session(day(0), "a", TimerMode::Work),
            session(day(1), "a", TimerMode::Work),
            session(day(2), "a", TimerMode::Work),
            session(day(4), "a", TimerMode::Work),
        ];
        assert_eq!(build_stats_at(today, &with_today).streak, 3);

        let from_yesterday = vec![
            session(day(1), "a", TimerMode::Work),
            session(day(2), "a", TimerMode::Work),
        ];
        assert_eq!(build_stats_at(today, &from_yesterday).streak, 2);

        let lapsed = vec![session(day(2), "a", TimerMode::Work)];
        assert_eq!(build_stats_at(today, &lapsed).streak, 0);

        let breaks_only = vec![session(day(0), "a", TimerMode::Break)];
        assert_eq!(build_stats_at(today, &breaks_only).streak, 0);
    }
}
