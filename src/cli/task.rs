//! dayplan task command implementations.

use serde::Serialize;

use crate::auth::is_valid_email;
use crate::cli::{ensure_applied, short_id, Context, GlobalOptions, Target};
use crate::error::{Error, Result};
use crate::guard::dashboard_path;
use crate::mail::MailReceipt;
use crate::model::{parse_time, DayKey, Task, TaskPatch, TaskStatus, TaskType};
use crate::output::{emit_success, HumanOutput};
use crate::store::{Action, Outcome, TaskStore};

pub struct AddOptions {
    pub title: String,
    pub date: Option<String>,
    pub time: String,
    pub task_type: String,
    pub description: Option<String>,
    pub recurring_days: Vec<u32>,
    pub notify: Option<String>,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub date: Option<String>,
    pub status: Option<String>,
    pub global: GlobalOptions,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub task_type: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub recurring_days: Option<Vec<u32>>,
    pub no_recurring: bool,
    pub notify: Option<String>,
    pub no_notify: bool,
    pub global: GlobalOptions,
}

pub struct SetStatusOptions {
    pub id: String,
    pub status: TaskStatus,
    pub command: &'static str,
    pub global: GlobalOptions,
}

pub struct RmOptions {
    pub id: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TaskAddedOutput {
    task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<MailReceipt>,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    total: usize,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct TaskDeletedOutput {
    id: String,
    deleted: bool,
}

/// Open the task store behind the session gate.
fn open_store(global: &GlobalOptions) -> Result<(Context, TaskStore)> {
    let ctx = Context::load(global)?;
    ctx.require_session(&dashboard_path(ctx.today_key()))?;
    let store = TaskStore::open(ctx.storage.clone());
    Ok((ctx, store))
}

fn validate_notify(email: &str) -> Result<String> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(Error::InvalidArgument(format!(
            "invalid notification email: {email}"
        )));
    }
    Ok(email.to_string())
}

pub(crate) fn task_line(task: &Task) -> String {
    format!(
        "{} {} [{}] {} ({}) {}",
        task.date,
        task.time,
        task.status,
        task.title,
        task.task_type,
        short_id(&task.id)
    )
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Date", task.date.to_string());
    human.push_summary("Time", task.time.clone());
    human.push_summary("Type", task.task_type.to_string());
    human.push_summary("Status", task.status.to_string());
    if let Some(days) = task.recurring_days.as_ref().filter(|_| task.is_recurring) {
        let days: Vec<String> = days.iter().map(u32::to_string).collect();
        human.push_summary("Repeats on", days.join(", "));
    }
    if let Some(email) = &task.email {
        human.push_summary("Reminder", email.clone());
    }
    if !task.description.is_empty() {
        human.push_detail(task.description.clone());
    }
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let title = options.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("title cannot be empty".to_string()));
    }
    let date = ctx.day_or_today(options.date.as_deref())?;
    parse_time(&options.time)?;
    let task_type: TaskType = options.task_type.parse()?;

    let mut task = Task::new(date, options.time.clone(), title, task_type);
    if let Some(description) = options.description {
        task = task.with_description(description);
    }
    if !options.recurring_days.is_empty() {
        task = task.with_recurring_days(options.recurring_days);
    }
    if let Some(email) = options.notify.as_deref() {
        task = task.with_notification(validate_notify(email)?);
    }

    let outcome = store.dispatch(Action::AddTask(task.clone()))?;
    ensure_applied(outcome, Target::Task(&task.id))?;

    let notification = task
        .email
        .clone()
        .filter(|_| task.has_notification)
        .map(|email| ctx.mailer().send_task_notification(&email, &task));

    let mut human = HumanOutput::new("Task added");
    push_task_summary(&mut human, &task);
    if let Some(receipt) = notification.as_ref().filter(|receipt| !receipt.success) {
        human.push_warning(format!(
            "reminder mail not sent: {}",
            receipt.error.as_deref().unwrap_or("unknown error")
        ));
    }
    human.push_next_step(format!("dayplan view slots {}", task.date));

    emit_success(
        ctx.output,
        "task add",
        &TaskAddedOutput {
            task,
            notification,
        },
        &human,
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let (ctx, store) = open_store(&options.global)?;
    let date: Option<DayKey> = options.date.as_deref().map(str::parse).transpose()?;
    let status: Option<TaskStatus> = options.status.as_deref().map(str::parse).transpose()?;

    let tasks: Vec<&Task> = store
        .state()
        .tasks
        .iter()
        .filter(|task| date.map_or(true, |date| task.date == date))
        .filter(|task| status.map_or(true, |status| task.status == status))
        .collect();

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    emit_success(
        ctx.output,
        "task list",
        &TaskListOutput {
            total: tasks.len(),
            tasks,
        },
        &human,
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let (ctx, store) = open_store(&options.global)?;
    let id = store.resolve_task_id(&options.id)?;
    let task = store
        .state()
        .task(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut human = HumanOutput::new(format!("Task {}", short_id(&task.id)));
    push_task_summary(&mut human, task);

    emit_success(ctx.output, "task show", task, &human)
}

fn build_patch(options: &UpdateOptions) -> Result<TaskPatch> {
    let mut patch = TaskPatch {
        title: options.title.as_ref().map(|title| title.trim().to_string()),
        description: options.description.clone(),
        date: options.date.as_deref().map(str::parse).transpose()?,
        task_type: options.task_type.as_deref().map(str::parse).transpose()?,
        status: options.status.as_deref().map(str::parse).transpose()?,
        ..TaskPatch::default()
    };
    if let Some(time) = &options.time {
        parse_time(time)?;
        patch.time = Some(time.clone());
    }
    if let Some(days) = &options.recurring_days {
        patch.is_recurring = Some(true);
        patch.recurring_days = Some(Some(days.clone()));
    }
    if options.no_recurring {
        patch.is_recurring = Some(false);
        patch.recurring_days = Some(None);
    }
    if let Some(email) = options.notify.as_deref() {
        patch.has_notification = Some(true);
        patch.email = Some(Some(validate_notify(email)?));
    }
    if options.no_notify {
        patch.has_notification = Some(false);
        patch.email = Some(None);
    }
    Ok(patch)
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let patch = build_patch(&options)?;
    if patch.is_empty() {
        return Err(Error::InvalidArgument("nothing to update".to_string()));
    }
    let id = store.resolve_task_id(&options.id)?;
    let outcome = store.dispatch(Action::UpdateTask {
        id: id.clone(),
        patch,
    })?;
    ensure_applied(outcome, Target::Task(&id))?;

    let task = store
        .state()
        .task(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, task);

    emit_success(ctx.output, "task update", task, &human)
}

pub fn run_set_status(options: SetStatusOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let id = store.resolve_task_id(&options.id)?;
    let outcome = store.dispatch(Action::UpdateTask {
        id: id.clone(),
        patch: TaskPatch::status(options.status),
    })?;
    ensure_applied(outcome, Target::Task(&id))?;

    let task = store
        .state()
        .task(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    let mut human = HumanOutput::new(format!("Task {}", options.status));
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());

    emit_success(ctx.output, options.command, task, &human)
}

/// Deleting an unknown id is a no-op that still succeeds.
pub fn run_rm(options: RmOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let id = match store.resolve_task_id(&options.id) {
        Ok(id) => id,
        Err(Error::TaskNotFound(_)) => options.id.trim().to_string(),
        Err(err) => return Err(err),
    };
    let outcome = store.dispatch(Action::DeleteTask { id: id.clone() })?;
    let deleted = outcome == Outcome::Applied;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", id.clone());
    if !deleted {
        human.push_warning(format!("no task with id {id}; nothing deleted"));
    }

    emit_success(
        ctx.output,
        "task rm",
        &TaskDeletedOutput { id, deleted },
        &human,
    )
}
