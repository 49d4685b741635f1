//! Read-only projections over the task list.
//!
//! Day keys carry no year, so month-based projections take the year from
//! the caller and read every `DD.MM` key in that year.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{days_in_month, DayKey, Task, TaskStatus, TaskType};

/// First hour shown in the slot grid
pub const SLOT_FIRST_HOUR: u32 = 1;
/// Last hour shown in the slot grid
pub const SLOT_LAST_HOUR: u32 = 6;
const SLOT_MINUTES: [u32; 4] = [0, 15, 30, 45];

/// The fixed grid of start times, `01:00` through `06:45`.
pub fn time_slots() -> Vec<String> {
    (SLOT_FIRST_HOUR..=SLOT_LAST_HOUR)
        .flat_map(|hour| {
            SLOT_MINUTES
                .iter()
                .map(move |minute| format!("{hour:02}:{minute:02}"))
        })
        .collect()
}

pub fn in_slot_window(task: &Task) -> bool {
    task.hour()
        .is_some_and(|hour| (SLOT_FIRST_HOUR..=SLOT_LAST_HOUR).contains(&hour))
}

/// Tasks scheduled on `date`, in stored order.
pub fn daily(tasks: &[Task], date: DayKey) -> Vec<&Task> {
    tasks.iter().filter(|task| task.date == date).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotBucket<'a> {
    pub time: String,
    pub tasks: Vec<&'a Task>,
}

/// Tasks on `date` inside the slot window, bucketed by exact start time.
///
/// Only non-empty buckets are returned, in slot order. A task whose time is
/// inside the window but off the grid (e.g. `01:10`) lands in no bucket.
pub fn daily_slots(tasks: &[Task], date: DayKey) -> Vec<SlotBucket<'_>> {
    let day: Vec<&Task> = daily(tasks, date)
        .into_iter()
        .filter(|task| in_slot_window(task))
        .collect();

    time_slots()
        .into_iter()
        .filter_map(|slot| {
            let bucket: Vec<&Task> = day.iter().copied().filter(|task| task.time == slot).collect();
            (!bucket.is_empty()).then_some(SlotBucket {
                time: slot,
                tasks: bucket,
            })
        })
        .collect()
}

/// First day of the week containing `date`.
pub fn week_start(date: NaiveDate, first_day: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() - first_day.num_days_from_monday()) % 7;
    date - Duration::days(i64::from(offset))
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Pazartesi",
        Weekday::Tue => "Salı",
        Weekday::Wed => "Çarşamba",
        Weekday::Thu => "Perşembe",
        Weekday::Fri => "Cuma",
        Weekday::Sat => "Cumartesi",
        Weekday::Sun => "Pazar",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekDay<'a> {
    pub date: DayKey,
    pub weekday: &'static str,
    pub tasks: Vec<&'a Task>,
}

/// Seven consecutive days from `start`, each with its tasks.
pub fn weekly(tasks: &[Task], start: NaiveDate) -> Vec<WeekDay<'_>> {
    (0..7)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let key = DayKey::from_date(date);
            WeekDay {
                date: key,
                weekday: weekday_name(date.weekday()),
                tasks: daily(tasks, key),
            }
        })
        .collect()
}

/// Percentage rounded half-up; `None` when there is nothing to rate.
pub fn completion_rate(completed: usize, total: usize) -> Option<u32> {
    if total == 0 {
        return None;
    }
    let rate = (200 * completed + total) / (2 * total);
    u32::try_from(rate).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: DayKey,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub total: usize,
    pub completion_rate: Option<u32>,
}

pub fn day_stats(tasks: &[Task], date: DayKey) -> DayStats {
    let day = daily(tasks, date);
    let count = |status: TaskStatus| day.iter().filter(|task| task.status == status).count();
    let completed = count(TaskStatus::Completed);
    DayStats {
        date,
        completed,
        failed: count(TaskStatus::Failed),
        pending: count(TaskStatus::Pending),
        total: day.len(),
        completion_rate: completion_rate(completed, day.len()),
    }
}

fn check_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("month must be 1-12, got {month}")))
    }
}

/// Per-day counts for every day of `month` in `year`.
pub fn monthly(tasks: &[Task], year: i32, month: u32) -> Result<Vec<DayStats>> {
    check_month(month)?;
    (1..=days_in_month(year, month))
        .map(|day| DayKey::new(day, month).map(|key| day_stats(tasks, key)))
        .collect()
}

/// Blank cells around a Monday-first month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub leading_blanks: u32,
    pub days: u32,
    pub trailing_blanks: u32,
}

pub fn month_grid(year: i32, month: u32) -> Result<MonthGrid> {
    check_month(month)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidArgument(format!("invalid year {year}")))?;
    let leading_blanks = first.weekday().num_days_from_monday();
    let days = days_in_month(year, month);
    let trailing_blanks = (7 - (leading_blanks + days) % 7) % 7;
    Ok(MonthGrid {
        leading_blanks,
        days,
        trailing_blanks,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: DayKey,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub year: i32,
    pub month: u32,
    pub total: usize,
    pub status: StatusCounts,
    pub by_type: Vec<TypeCount>,
    pub by_day: Vec<DayCount>,
}

/// Status, type and per-day counts for tasks dated in `month` of `year`.
///
/// A key that does not exist in `year` (29.02 outside leap years) is not
/// counted. Per-day entries are chronological.
pub fn statistics(tasks: &[Task], year: i32, month: u32) -> Result<Statistics> {
    check_month(month)?;
    let in_month: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.date.month() == month && task.date.in_year(year).is_some())
        .collect();

    let mut status = StatusCounts::default();
    let mut types: BTreeMap<TaskType, usize> = BTreeMap::new();
    let mut days: BTreeMap<DayKey, usize> = BTreeMap::new();
    for task in &in_month {
        match task.status {
            TaskStatus::Completed => status.completed += 1,
            TaskStatus::Failed => status.failed += 1,
            TaskStatus::Pending => status.pending += 1,
        }
        *types.entry(task.task_type).or_default() += 1;
        *days.entry(task.date).or_default() += 1;
    }

    Ok(Statistics {
        year,
        month,
        total: in_month.len(),
        status,
        by_type: types
            .into_iter()
            .map(|(task_type, count)| TypeCount { task_type, count })
            .collect(),
        by_day: days
            .into_iter()
            .map(|(date, count)| DayCount { date, count })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(raw: &str) -> DayKey {
        raw.parse().expect("day key")
    }

    fn task(date: &str, time: &str, status: TaskStatus, task_type: TaskType) -> Task {
        let mut task = Task::new(day(date), time, format!("{date} {time}"), task_type);
        task.status = status;
        task
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn slots_cover_one_to_six_in_quarters() {
        let slots = time_slots();
        assert_eq!(slots.len(), 24);
        assert_eq!(slots.first().map(String::as_str), Some("01:00"));
        assert_eq!(slots.last().map(String::as_str), Some("06:45"));
        assert!(slots.contains(&"03:30".to_string()));
    }

    #[test]
    fn daily_matches_exact_date() {
        let tasks = vec![
            task("01.06", "01:00", TaskStatus::Pending, TaskType::Software),
            task("02.06", "01:00", TaskStatus::Pending, TaskType::Software),
            task("01.06", "09:00", TaskStatus::Pending, TaskType::Software),
        ];
        let today = daily(&tasks, day("01.06"));
        assert_eq!(today.len(), 2);
        assert!(today.iter().all(|task| task.date == day("01.06")));
    }

    #[test]
    fn slot_view_excludes_tasks_outside_window() {
        let tasks = vec![
            task("01.06", "07:00", TaskStatus::Pending, TaskType::Software),
            task("01.06", "01:00", TaskStatus::Pending, TaskType::Software),
            task("01.06", "01:00", TaskStatus::Completed, TaskType::English),
            task("01.06", "06:45", TaskStatus::Pending, TaskType::Software),
            task("01.06", "01:10", TaskStatus::Pending, TaskType::Software),
        ];
        let buckets = daily_slots(&tasks, day("01.06"));
        let times: Vec<&str> = buckets.iter().map(|bucket| bucket.time.as_str()).collect();
        assert_eq!(times, vec!["01:00", "06:45"]);
        assert_eq!(buckets[0].tasks.len(), 2);
        assert!(buckets
            .iter()
            .flat_map(|bucket| bucket.tasks.iter())
            .all(|task| task.time != "07:00"));
    }

    #[test]
    fn week_starts_on_configured_day() {
        // 2025-06-04 is a Wednesday.
        let wednesday = date(2025, 6, 4);
        assert_eq!(week_start(wednesday, Weekday::Mon), date(2025, 6, 2));
        assert_eq!(week_start(wednesday, Weekday::Sun), date(2025, 6, 1));
        assert_eq!(week_start(date(2025, 6, 2), Weekday::Mon), date(2025, 6, 2));
    }

    #[test]
    fn weekly_spans_seven_days_across_month_end() {
        let tasks = vec![task("01.07", "02:00", TaskStatus::Pending, TaskType::Software)];
        let week = weekly(&tasks, date(2025, 6, 30));
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, day("30.06"));
        assert_eq!(week[0].weekday, "Pazartesi");
        assert_eq!(week[1].date, day("01.07"));
        assert_eq!(week[1].tasks.len(), 1);
        assert_eq!(week[6].weekday, "Pazar");
    }

    #[test]
    fn monthly_counts_statuses_and_rounds_rate() {
        let tasks = vec![
            task("01.06", "01:00", TaskStatus::Completed, TaskType::Software),
            task("01.06", "02:00", TaskStatus::Failed, TaskType::Software),
        ];
        let month = monthly(&tasks, 2025, 6).expect("monthly");
        assert_eq!(month.len(), 30);
        let first = month[0];
        assert_eq!(first.date, day("01.06"));
        assert_eq!(
            (first.pending, first.completed, first.failed, first.total),
            (0, 1, 1, 2)
        );
        assert_eq!(first.completion_rate, Some(50));
        assert_eq!(month[1].total, 0);
        assert_eq!(month[1].completion_rate, None);
    }

    #[test]
    fn monthly_day_with_only_pending_and_failed_rates_zero() {
        let tasks = vec![
            task("01.06", "01:00", TaskStatus::Pending, TaskType::SchoolLesson),
            task("15.06", "02:00", TaskStatus::Completed, TaskType::Software),
            task("01.06", "03:00", TaskStatus::Failed, TaskType::English),
        ];
        let month = monthly(&tasks, 2025, 6).expect("monthly");
        assert_eq!(month.len(), 30);

        let first = month[0];
        assert_eq!(
            (first.completed, first.failed, first.pending, first.total),
            (0, 1, 1, 2)
        );
        assert_eq!(first.completion_rate, Some(0));

        let fifteenth = month[14];
        assert_eq!(fifteenth.date, day("15.06"));
        assert_eq!((fifteenth.completed, fifteenth.total), (1, 1));
        assert_eq!(fifteenth.completion_rate, Some(100));
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(completion_rate(1, 3), Some(33));
        assert_eq!(completion_rate(2, 3), Some(67));
        assert_eq!(completion_rate(1, 8), Some(13));
        assert_eq!(completion_rate(0, 4), Some(0));
        assert_eq!(completion_rate(0, 0), None);
    }

    #[test]
    fn monthly_rejects_bad_month() {
        assert!(monthly(&[], 2025, 13).is_err());
        assert!(statistics(&[], 2025, 0).is_err());
    }

    #[test]
    fn month_grid_pads_to_whole_weeks() {
        // June 2025 starts on a Sunday.
        let grid = month_grid(2025, 6).expect("grid");
        assert_eq!(grid.leading_blanks, 6);
        assert_eq!(grid.days, 30);
        assert_eq!((grid.leading_blanks + grid.days + grid.trailing_blanks) % 7, 0);

        // September 2025 starts on a Monday.
        assert_eq!(month_grid(2025, 9).expect("grid").leading_blanks, 0);
    }

    #[test]
    fn statistics_group_by_type_and_day() {
        let tasks = vec![
            task("15.06", "01:00", TaskStatus::Completed, TaskType::English),
            task("02.06", "01:00", TaskStatus::Pending, TaskType::Software),
            task("02.06", "02:00", TaskStatus::Failed, TaskType::English),
            task("02.07", "02:00", TaskStatus::Failed, TaskType::StandardizedTestPrep),
        ];
        let stats = statistics(&tasks, 2025, 6).expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(
            stats.status,
            StatusCounts {
                completed: 1,
                failed: 1,
                pending: 1
            }
        );
        assert_eq!(
            stats.by_type,
            vec![
                TypeCount {
                    task_type: TaskType::Software,
                    count: 1
                },
                TypeCount {
                    task_type: TaskType::English,
                    count: 2
                },
            ]
        );
        let days: Vec<String> = stats.by_day.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(days, vec!["02.06", "15.06"]);
        assert_eq!(stats.by_day[0].count, 2);
    }

    #[test]
    fn statistics_skip_leap_day_outside_leap_years() {
        let tasks = vec![task("29.02", "01:00", TaskStatus::Pending, TaskType::Software)];
        assert_eq!(statistics(&tasks, 2025, 2).expect("stats").total, 0);
        assert_eq!(statistics(&tasks, 2024, 2).expect("stats").total, 1);
    }
}
