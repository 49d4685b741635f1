//! Task, topic and state records.
//!
//! Field names and enum labels match the JSON layout of the `task-state`
//! persistence slot, so a blob written by one version reads back unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Task category. Serialized with the planner's display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "Okul Dersi", alias = "school_lesson")]
    SchoolLesson,
    #[serde(rename = "Yazılım", alias = "software")]
    Software,
    #[serde(rename = "TYT", alias = "standardized_test_prep")]
    StandardizedTestPrep,
    #[serde(rename = "İngilizce", alias = "english")]
    English,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::SchoolLesson,
        TaskType::Software,
        TaskType::StandardizedTestPrep,
        TaskType::English,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskType::SchoolLesson => "Okul Dersi",
            TaskType::Software => "Yazılım",
            TaskType::StandardizedTestPrep => "TYT",
            TaskType::English => "İngilizce",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            TaskType::SchoolLesson => "school-lesson",
            TaskType::Software => "software",
            TaskType::StandardizedTestPrep => "test-prep",
            TaskType::English => "english",
        }
    }
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::SchoolLesson
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        TaskType::ALL
            .into_iter()
            .find(|kind| {
                kind.label() == trimmed
                    || kind.slug().eq_ignore_ascii_case(trimmed)
                    || kind.slug().replace('-', "_").eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown task type '{trimmed}' (expected school-lesson|software|test-prep|english)"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "failed" | "fail" => Ok(TaskStatus::Failed),
            other => Err(Error::InvalidArgument(format!(
                "unknown task status '{other}' (expected pending|completed|failed)"
            ))),
        }
    }
}

/// Calendar day without a year, written `DD.MM`.
///
/// Ordering is chronological within a year (month first, then day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey {
    month: u32,
    day: u32,
}

impl DayKey {
    pub fn new(day: u32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidArgument(format!(
                "invalid month {month} in day key"
            )));
        }
        // Leap year so 29.02 is representable; the year is applied later.
        let max_day = days_in_month(2024, month);
        if day == 0 || day > max_day {
            return Err(Error::InvalidArgument(format!(
                "invalid day {day} for month {month} in day key"
            )));
        }
        Ok(Self { month, day })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The calendar date this key denotes in `year`, if it exists there.
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.day, self.month)
    }
}

impl FromStr for DayKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || Error::InvalidArgument(format!("invalid day key '{trimmed}' (expected DD.MM)"));
        let (day, month) = trimmed.split_once('.').ok_or_else(invalid)?;
        if day.len() != 2 || month.len() != 2 {
            return Err(invalid());
        }
        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        DayKey::new(day, month)
    }
}

impl TryFrom<String> for DayKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DayKey> for String {
    fn from(value: DayKey) -> Self {
        value.to_string()
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Validate a `HH:MM` 24-hour time string.
pub fn parse_time(value: &str) -> Result<(u32, u32)> {
    let invalid = || Error::InvalidArgument(format!("invalid time '{value}' (expected HH:MM)"));
    let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
    if hour.len() != 2 || minute.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A dated, timed to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub date: DayKey,
    pub time: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_days: Option<Vec<u32>>,
    #[serde(default)]
    pub has_notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Task {
    /// New pending task with a fresh id; recurrence and notification off.
    pub fn new(
        date: DayKey,
        time: impl Into<String>,
        title: impl Into<String>,
        task_type: TaskType,
    ) -> Self {
        Self {
            id: new_id(),
            date,
            time: time.into(),
            title: title.into(),
            description: String::new(),
            task_type,
            status: TaskStatus::Pending,
            is_recurring: false,
            recurring_days: None,
            has_notification: false,
            email: None,
        }
    }

    /// Copy a backlog item into the schedule.
    pub fn from_topic_task(source: &TopicTask, date: DayKey, time: impl Into<String>) -> Self {
        let mut task = Task::new(date, time, source.title.clone(), TaskType::default());
        task.description = source.description.clone();
        task
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_notification(mut self, email: impl Into<String>) -> Self {
        self.has_notification = true;
        self.email = Some(email.into());
        self
    }

    pub fn with_recurring_days(mut self, days: Vec<u32>) -> Self {
        self.is_recurring = true;
        self.recurring_days = Some(days);
        self
    }

    /// Hour component of `time`, read the way the slot filter reads it.
    pub fn hour(&self) -> Option<u32> {
        self.time.split(':').next()?.trim().parse().ok()
    }

    /// Check the record invariants; the reason is returned on failure.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("task id cannot be empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("task title cannot be empty".to_string());
        }
        parse_time(&self.time).map_err(|err| err.to_string())?;
        match (self.has_notification, self.email.as_deref()) {
            (true, None) => return Err("notification enabled without an email".to_string()),
            (true, Some(email)) if email.trim().is_empty() => {
                return Err("notification email cannot be empty".to_string())
            }
            (false, Some(_)) => return Err("email set without notification".to_string()),
            _ => {}
        }
        if let Some(days) = &self.recurring_days {
            if let Some(day) = days.iter().find(|day| !(1..=31).contains(*day)) {
                return Err(format!("recurring day {day} out of range 1-31"));
            }
        }
        Ok(())
    }
}

/// Partial update for a [`Task`]; `None` leaves a field untouched.
///
/// `recurring_days` and `email` are doubly optional so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub date: Option<DayKey>,
    pub time: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub is_recurring: Option<bool>,
    pub recurring_days: Option<Option<Vec<u32>>>,
    pub has_notification: Option<bool>,
    pub email: Option<Option<String>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Shallow merge onto `task`. The id never changes.
    pub fn merge_into(&self, task: &Task) -> Task {
        let mut merged = task.clone();
        if let Some(date) = self.date {
            merged.date = date;
        }
        if let Some(time) = &self.time {
            merged.time = time.clone();
        }
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(description) = &self.description {
            merged.description = description.clone();
        }
        if let Some(task_type) = self.task_type {
            merged.task_type = task_type;
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(is_recurring) = self.is_recurring {
            merged.is_recurring = is_recurring;
        }
        if let Some(days) = &self.recurring_days {
            merged.recurring_days = days.clone();
        }
        if let Some(has_notification) = self.has_notification {
            merged.has_notification = has_notification;
        }
        if let Some(email) = &self.email {
            merged.email = email.clone();
        }
        merged
    }
}

/// A backlog item owned by exactly one [`Topic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub added_to_daily: bool,
}

impl TopicTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            added_to_daily: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicTaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub added_to_daily: Option<bool>,
}

impl TopicTaskPatch {
    pub fn added_to_daily() -> Self {
        Self {
            added_to_daily: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn merge_into(&self, task: &TopicTask) -> TopicTask {
        let mut merged = task.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(description) = &self.description {
            merged.description = description.clone();
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(added) = self.added_to_daily {
            merged.added_to_daily = added;
        }
        merged
    }
}

/// A named backlog grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<TopicTask>,
}

impl Topic {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            tasks: Vec::new(),
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&TopicTask> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Case-insensitive title lookup, ignoring the task `except`.
    pub fn has_title(&self, title: &str, except: Option<&str>) -> bool {
        let wanted = title.to_lowercase();
        self.tasks
            .iter()
            .filter(|task| Some(task.id.as_str()) != except)
            .any(|task| task.title.to_lowercase() == wanted)
    }
}

/// The aggregate root persisted in the `task-state` slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl State {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == id)
    }

    pub fn topic_task(&self, topic_id: &str, task_id: &str) -> Option<&TopicTask> {
        self.topic(topic_id)?.task(task_id)
    }
}
