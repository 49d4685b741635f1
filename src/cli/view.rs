//! dayplan view command implementations.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::cli::task::task_line;
use crate::cli::{Context, GlobalOptions};
use crate::error::{Error, Result};
use crate::guard::dashboard_path;
use crate::model::{DayKey, Task};
use crate::output::{emit_success, HumanOutput};
use crate::store::TaskStore;
use crate::views::{self, DayStats, MonthGrid, SlotBucket, Statistics, WeekDay};

pub struct DayOptions {
    pub date: Option<String>,
    pub global: GlobalOptions,
}

pub struct MonthOptions {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct DailyOutput<'a> {
    date: DayKey,
    total: usize,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct SlotsOutput<'a> {
    date: DayKey,
    slots: Vec<SlotBucket<'a>>,
}

#[derive(Serialize)]
struct WeeklyOutput<'a> {
    week_start: NaiveDate,
    days: Vec<WeekDay<'a>>,
}

#[derive(Serialize)]
struct MonthlyOutput {
    year: i32,
    month: u32,
    grid: MonthGrid,
    days: Vec<DayStats>,
}

#[derive(Serialize)]
struct TimeSlotsOutput {
    slots: Vec<String>,
}

fn open_store(global: &GlobalOptions, route: &str) -> Result<(Context, TaskStore)> {
    let ctx = Context::load(global)?;
    ctx.require_session(route)?;
    let store = TaskStore::open(ctx.storage.clone());
    Ok((ctx, store))
}

/// Full date for a `DD.MM` argument, taking the year from today.
fn resolve_date(ctx: &Context, raw: Option<&str>) -> Result<NaiveDate> {
    let Some(raw) = raw else {
        return Ok(ctx.today);
    };
    let key: DayKey = raw.parse()?;
    key.in_year(ctx.today.year()).ok_or_else(|| {
        Error::InvalidArgument(format!("{key} does not exist in {}", ctx.today.year()))
    })
}

fn resolve_month(ctx: &Context, options: &MonthOptions) -> (i32, u32) {
    (
        options.year.unwrap_or_else(|| ctx.today.year()),
        options.month.unwrap_or_else(|| ctx.today.month()),
    )
}

pub fn run_daily(options: DayOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let date = ctx.day_or_today(options.date.as_deref())?;
    ctx.require_session(&dashboard_path(date))?;
    let store = TaskStore::open(ctx.storage.clone());
    let tasks = views::daily(&store.state().tasks, date);

    let mut human = HumanOutput::new(format!("Tasks on {date}"));
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    emit_success(
        ctx.output,
        "view daily",
        &DailyOutput {
            date,
            total: tasks.len(),
            tasks,
        },
        &human,
    )
}

pub fn run_slots(options: DayOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let date = ctx.day_or_today(options.date.as_deref())?;
    ctx.require_session(&dashboard_path(date))?;
    let store = TaskStore::open(ctx.storage.clone());
    let slots = views::daily_slots(&store.state().tasks, date);

    let mut human = HumanOutput::new(format!("Schedule for {date}"));
    human.push_summary(
        "Scheduled",
        slots.iter().map(|slot| slot.tasks.len()).sum::<usize>().to_string(),
    );
    for slot in &slots {
        for task in &slot.tasks {
            human.push_detail(format!("{} {} [{}] {}", slot.time, task.title, task.status, task.task_type));
        }
    }

    emit_success(
        ctx.output,
        "view slots",
        &SlotsOutput { date, slots },
        &human,
    )
}

pub fn run_weekly(options: DayOptions) -> Result<()> {
    let (ctx, store) = open_store(&options.global, "/weekly")?;
    let anchor = resolve_date(&ctx, options.date.as_deref())?;
    let first_day = ctx.config.views.first_weekday()?;
    let start = views::week_start(anchor, first_day);
    let days = views::weekly(&store.state().tasks, start);

    let mut human = HumanOutput::new(format!("Week of {}", DayKey::from_date(start)));
    for day in &days {
        human.push_detail(format!("{} {} ({} tasks)", day.date, day.weekday, day.tasks.len()));
        for task in &day.tasks {
            human.push_detail(format!("  {} {} [{}]", task.time, task.title, task.status));
        }
    }

    emit_success(
        ctx.output,
        "view weekly",
        &WeeklyOutput {
            week_start: start,
            days,
        },
        &human,
    )
}

pub fn run_monthly(options: MonthOptions) -> Result<()> {
    let (ctx, store) = open_store(&options.global, "/monthly")?;
    let (year, month) = resolve_month(&ctx, &options);
    let days = views::monthly(&store.state().tasks, year, month)?;
    let grid = views::month_grid(year, month)?;

    let mut human = HumanOutput::new(format!("{year}-{month:02}"));
    for day in days.iter().filter(|day| day.total > 0) {
        let rate = day
            .completion_rate
            .map(|rate| format!("{rate}%"))
            .unwrap_or_else(|| "-".to_string());
        human.push_detail(format!(
            "{} {}/{} done, {} failed, {} pending ({rate})",
            day.date, day.completed, day.total, day.failed, day.pending
        ));
    }
    if days.iter().all(|day| day.total == 0) {
        human.push_summary("Tasks", "none");
    }

    emit_success(
        ctx.output,
        "view monthly",
        &MonthlyOutput {
            year,
            month,
            grid,
            days,
        },
        &human,
    )
}

pub fn run_stats(options: MonthOptions) -> Result<()> {
    let (ctx, store) = open_store(&options.global, "/stats")?;
    let (year, month) = resolve_month(&ctx, &options);
    let stats: Statistics = views::statistics(&store.state().tasks, year, month)?;

    let mut human = HumanOutput::new(format!("Statistics {year}-{month:02}"));
    human.push_summary("Total", stats.total.to_string());
    human.push_summary("Completed", stats.status.completed.to_string());
    human.push_summary("Failed", stats.status.failed.to_string());
    human.push_summary("Pending", stats.status.pending.to_string());
    for entry in &stats.by_type {
        human.push_detail(format!("{}: {}", entry.task_type, entry.count));
    }
    for entry in &stats.by_day {
        human.push_detail(format!("{}: {}", entry.date, entry.count));
    }

    emit_success(ctx.output, "view stats", &stats, &human)
}

/// The slot grid needs no state, so it skips the session gate.
pub fn run_time_slots(global: GlobalOptions) -> Result<()> {
    let slots = views::time_slots();
    let mut human = HumanOutput::new("Time slots");
    human.push_summary("Count", slots.len().to_string());
    human.push_detail(slots.join(" "));

    emit_success(
        global.output(),
        "slots",
        &TimeSlotsOutput { slots },
        &human,
    )
}
