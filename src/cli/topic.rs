//! dayplan topic command implementations.

use serde::Serialize;

use crate::cli::{ensure_applied, short_id, Context, GlobalOptions, Target};
use crate::error::{Error, Result};
use crate::model::{Task, TaskStatus, Topic, TopicTask, TopicTaskPatch};
use crate::output::{emit_success, HumanOutput};
use crate::store::{Action, Outcome, TaskStore};
use crate::views::time_slots;

const TOPICS_ROUTE: &str = "/topics";

pub struct AddOptions {
    pub title: String,
    pub global: GlobalOptions,
}

pub struct RmOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct TaskAddOptions {
    pub topic: String,
    pub title: String,
    pub description: Option<String>,
    pub global: GlobalOptions,
}

pub struct TaskUpdateOptions {
    pub topic: String,
    pub task: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub command: &'static str,
    pub global: GlobalOptions,
}

pub struct TaskRmOptions {
    pub topic: String,
    pub task: String,
    pub global: GlobalOptions,
}

pub struct PromoteOptions {
    pub topic: String,
    pub task: String,
    pub date: Option<String>,
    pub time: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TopicListOutput<'a> {
    total: usize,
    topics: &'a [Topic],
}

#[derive(Serialize)]
struct DeletedOutput {
    id: String,
    deleted: bool,
}

#[derive(Serialize)]
struct TopicTaskOutput<'a> {
    topic_id: &'a str,
    task: &'a TopicTask,
}

#[derive(Serialize)]
struct PromotedOutput<'a> {
    topic_id: &'a str,
    topic_task: &'a TopicTask,
    task: &'a Task,
}

fn open_store(global: &GlobalOptions) -> Result<(Context, TaskStore)> {
    let ctx = Context::load(global)?;
    ctx.require_session(TOPICS_ROUTE)?;
    let store = TaskStore::open(ctx.storage.clone());
    Ok((ctx, store))
}

fn topic_task_line(task: &TopicTask) -> String {
    let mut line = format!("[{}] {} {}", task.status, task.title, short_id(&task.id));
    if task.added_to_daily {
        line.push_str(" (scheduled)");
    }
    line
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let title = options.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("topic title cannot be empty".to_string()));
    }
    let topic = Topic::new(title);
    let outcome = store.dispatch(Action::AddTopic(topic.clone()))?;
    ensure_applied(outcome, Target::Topic(&topic.id))?;

    let mut human = HumanOutput::new("Topic added");
    human.push_summary("ID", topic.id.clone());
    human.push_summary("Title", topic.title.clone());
    human.push_next_step(format!(
        "dayplan topic task add {} \"<title>\"",
        short_id(&topic.id)
    ));

    emit_success(ctx.output, "topic add", &topic, &human)
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let id = match store.resolve_topic_id(&options.id) {
        Ok(id) => id,
        Err(Error::TopicNotFound(_)) => options.id.trim().to_string(),
        Err(err) => return Err(err),
    };
    let outcome = store.dispatch(Action::DeleteTopic { id: id.clone() })?;
    let deleted = outcome == Outcome::Applied;

    let mut human = HumanOutput::new("Topic deleted");
    human.push_summary("ID", id.clone());
    if !deleted {
        human.push_warning(format!("no topic with id {id}; nothing deleted"));
    }

    emit_success(
        ctx.output,
        "topic rm",
        &DeletedOutput { id, deleted },
        &human,
    )
}

pub fn run_list(global: GlobalOptions) -> Result<()> {
    let (ctx, store) = open_store(&global)?;
    let topics = &store.state().topics;

    let mut human = HumanOutput::new("Topics");
    human.push_summary("Total", topics.len().to_string());
    for topic in topics {
        let done = topic
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .count();
        human.push_detail(format!(
            "{} {} ({}/{} done)",
            short_id(&topic.id),
            topic.title,
            done,
            topic.tasks.len()
        ));
        for task in &topic.tasks {
            human.push_detail(format!("  {}", topic_task_line(task)));
        }
    }

    emit_success(
        ctx.output,
        "topic list",
        &TopicListOutput {
            total: topics.len(),
            topics,
        },
        &human,
    )
}

pub fn run_task_add(options: TaskAddOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let topic_id = store.resolve_topic_id(&options.topic)?;
    let title = options.title.trim();
    let task = TopicTask::new(title, options.description.unwrap_or_default());

    let outcome = store.dispatch(Action::AddTopicTask {
        topic_id: topic_id.clone(),
        task: task.clone(),
    })?;
    ensure_applied(
        outcome,
        Target::TopicTask {
            topic_id: &topic_id,
            task_id: &task.id,
            title,
        },
    )?;

    let mut human = HumanOutput::new("Topic task added");
    human.push_summary("Topic", topic_id.clone());
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_next_step(format!(
        "dayplan topic task promote {} {} --time 01:00",
        short_id(&topic_id),
        short_id(&task.id)
    ));

    emit_success(
        ctx.output,
        "topic task add",
        &TopicTaskOutput {
            topic_id: &topic_id,
            task: &task,
        },
        &human,
    )
}

pub fn run_task_update(options: TaskUpdateOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let topic_id = store.resolve_topic_id(&options.topic)?;
    let task_id = store.resolve_topic_task_id(&topic_id, &options.task)?;
    let patch = TopicTaskPatch {
        title: options.title.as_ref().map(|title| title.trim().to_string()),
        description: options.description.clone(),
        status: options.status.as_deref().map(str::parse).transpose()?,
        added_to_daily: None,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument("nothing to update".to_string()));
    }

    let outcome = store.dispatch(Action::UpdateTopicTask {
        topic_id: topic_id.clone(),
        task_id: task_id.clone(),
        patch,
    })?;
    ensure_applied(
        outcome,
        Target::TopicTask {
            topic_id: &topic_id,
            task_id: &task_id,
            title: options.title.as_deref().unwrap_or_default().trim(),
        },
    )?;

    let task = store
        .state()
        .topic_task(&topic_id, &task_id)
        .ok_or_else(|| Error::TopicTaskNotFound {
            topic_id: topic_id.clone(),
            task_id: task_id.clone(),
        })?;
    let mut human = HumanOutput::new("Topic task updated");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());

    emit_success(
        ctx.output,
        options.command,
        &TopicTaskOutput {
            topic_id: &topic_id,
            task,
        },
        &human,
    )
}

pub fn run_task_rm(options: TaskRmOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let topic_id = store.resolve_topic_id(&options.topic)?;
    let task_id = match store.resolve_topic_task_id(&topic_id, &options.task) {
        Ok(id) => id,
        Err(Error::TopicTaskNotFound { .. }) => options.task.trim().to_string(),
        Err(err) => return Err(err),
    };
    let outcome = store.dispatch(Action::DeleteTopicTask {
        topic_id: topic_id.clone(),
        task_id: task_id.clone(),
    })?;
    let deleted = outcome == Outcome::Applied;

    let mut human = HumanOutput::new("Topic task deleted");
    human.push_summary("ID", task_id.clone());
    if !deleted {
        human.push_warning(format!("no task with id {task_id} in topic; nothing deleted"));
    }

    emit_success(
        ctx.output,
        "topic task rm",
        &DeletedOutput {
            id: task_id,
            deleted,
        },
        &human,
    )
}

pub fn run_promote(options: PromoteOptions) -> Result<()> {
    let (ctx, mut store) = open_store(&options.global)?;
    let topic_id = store.resolve_topic_id(&options.topic)?;
    let topic_task_id = store.resolve_topic_task_id(&topic_id, &options.task)?;
    let date = ctx.day_or_today(options.date.as_deref())?;
    let time = options.time.trim();
    if !time_slots().iter().any(|slot| slot == time) {
        return Err(Error::InvalidArgument(format!(
            "time must be one of the slots 01:00-06:45 in 15 minute steps, got '{time}'"
        )));
    }

    let mut human = HumanOutput::new("Topic task scheduled");
    if store
        .state()
        .topic_task(&topic_id, &topic_task_id)
        .is_some_and(|task| task.added_to_daily)
    {
        human.push_warning("this topic task was already added to the daily plan");
    }

    let new_id = store.promote(&topic_id, &topic_task_id, date, time)?;
    let state = store.state();
    let task = state
        .task(&new_id)
        .ok_or_else(|| Error::TaskNotFound(new_id.clone()))?;
    let topic_task = state
        .topic_task(&topic_id, &topic_task_id)
        .ok_or_else(|| Error::TopicTaskNotFound {
            topic_id: topic_id.clone(),
            task_id: topic_task_id.clone(),
        })?;

    human.push_summary("Task", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("When", format!("{} {}", task.date, task.time));
    human.push_next_step(format!("dayplan view slots {}", task.date));

    emit_success(
        ctx.output,
        "topic task promote",
        &PromotedOutput {
            topic_id: &topic_id,
            topic_task,
            task,
        },
        &human,
    )
}
