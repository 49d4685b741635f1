//! Task/topic store
//!
//! State changes go through one pure reducer, [`apply`], which turns the
//! current [`State`] and an [`Action`] into the next state plus an
//! [`Outcome`]. [`TaskStore`] owns the live state, runs the reducer and
//! mirrors every resulting snapshot into the `task-state` slot.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{DayKey, State, Task, TaskPatch, Topic, TopicTask, TopicTaskPatch};
use crate::storage::Storage;

/// A requested change to the task state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddTask(Task),
    UpdateTask { id: String, patch: TaskPatch },
    DeleteTask { id: String },
    AddTopic(Topic),
    DeleteTopic { id: String },
    AddTopicTask { topic_id: String, task: TopicTask },
    UpdateTopicTask { topic_id: String, task_id: String, patch: TopicTaskPatch },
    DeleteTopicTask { topic_id: String, task_id: String },
    /// Replace the whole state; used for rehydration only.
    LoadState(State),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddTask(_) => "add_task",
            Action::UpdateTask { .. } => "update_task",
            Action::DeleteTask { .. } => "delete_task",
            Action::AddTopic(_) => "add_topic",
            Action::DeleteTopic { .. } => "delete_topic",
            Action::AddTopicTask { .. } => "add_topic_task",
            Action::UpdateTopicTask { .. } => "update_topic_task",
            Action::DeleteTopicTask { .. } => "delete_topic_task",
            Action::LoadState(_) => "load_state",
        }
    }

    fn persists(&self) -> bool {
        !matches!(self, Action::LoadState(_))
    }
}

/// What the reducer did with an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// Target task, topic or topic task does not exist.
    NotFound,
    /// A topic already holds a task with this title (case-insensitive).
    DuplicateTitle,
    DuplicateId,
    Invalid { reason: String },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: State,
    pub outcome: Outcome,
}

impl Transition {
    fn applied(state: State) -> Self {
        Self {
            state,
            outcome: Outcome::Applied,
        }
    }

    fn rejected(state: &State, outcome: Outcome) -> Self {
        Self {
            state: state.clone(),
            outcome,
        }
    }
}

/// Pure state transition. Never panics; rejected actions return the input
/// state unchanged alongside the reason.
pub fn apply(state: &State, action: Action) -> Transition {
    match action {
        Action::AddTask(task) => {
            if state.task(&task.id).is_some() {
                return Transition::rejected(state, Outcome::DuplicateId);
            }
            if let Err(reason) = task.validate() {
                return Transition::rejected(state, Outcome::Invalid { reason });
            }
            let mut next = state.clone();
            next.tasks.push(task);
            Transition::applied(next)
        }
        Action::UpdateTask { id, patch } => {
            let Some(index) = state.tasks.iter().position(|task| task.id == id) else {
                return Transition::rejected(state, Outcome::NotFound);
            };
            let merged = patch.merge_into(&state.tasks[index]);
            if let Err(reason) = merged.validate() {
                return Transition::rejected(state, Outcome::Invalid { reason });
            }
            let mut next = state.clone();
            next.tasks[index] = merged;
            Transition::applied(next)
        }
        Action::DeleteTask { id } => {
            if state.task(&id).is_none() {
                return Transition::rejected(state, Outcome::NotFound);
            }
            let mut next = state.clone();
            next.tasks.retain(|task| task.id != id);
            Transition::applied(next)
        }
        Action::AddTopic(topic) => {
            if state.topic(&topic.id).is_some() {
                return Transition::rejected(state, Outcome::DuplicateId);
            }
            if let Err(reason) = validate_topic(&topic) {
                return Transition::rejected(state, Outcome::Invalid { reason });
            }
            let mut next = state.clone();
            next.topics.push(topic);
            Transition::applied(next)
        }
        Action::DeleteTopic { id } => {
            if state.topic(&id).is_none() {
                return Transition::rejected(state, Outcome::NotFound);
            }
            let mut next = state.clone();
            next.topics.retain(|topic| topic.id != id);
            Transition::applied(next)
        }
        Action::AddTopicTask { topic_id, task } => {
            let Some(index) = topic_index(state, &topic_id) else {
                return Transition::rejected(state, Outcome::NotFound);
            };
            let topic = &state.topics[index];
            if task.title.trim().is_empty() {
                return Transition::rejected(
                    state,
                    Outcome::Invalid {
                        reason: "topic task title cannot be empty".to_string(),
                    },
                );
            }
            if topic.task(&task.id).is_some() {
                return Transition::rejected(state, Outcome::DuplicateId);
            }
            if topic.has_title(&task.title, None) {
                return Transition::rejected(state, Outcome::DuplicateTitle);
            }
            let mut next = state.clone();
            next.topics[index].tasks.push(task);
            Transition::applied(next)
        }
        Action::UpdateTopicTask {
            topic_id,
            task_id,
            patch,
        } => {
            let Some(index) = topic_index(state, &topic_id) else {
                return Transition::rejected(state, Outcome::NotFound);
            };
            let topic = &state.topics[index];
            let Some(task_index) = topic.tasks.iter().position(|task| task.id == task_id) else {
                return Transition::rejected(state, Outcome::NotFound);
            };
            if let Some(title) = &patch.title {
                if title.trim().is_empty() {
                    return Transition::rejected(
                        state,
                        Outcome::Invalid {
                            reason: "topic task title cannot be empty".to_string(),
                        },
                    );
                }
                if topic.has_title(title, Some(&task_id)) {
                    return Transition::rejected(state, Outcome::DuplicateTitle);
                }
            }
            let merged = patch.merge_into(&topic.tasks[task_index]);
            let mut next = state.clone();
            next.topics[index].tasks[task_index] = merged;
            Transition::applied(next)
        }
        Action::DeleteTopicTask { topic_id, task_id } => {
            let Some(index) = topic_index(state, &topic_id) else {
                return Transition::rejected(state, Outcome::NotFound);
            };
            if state.topics[index].task(&task_id).is_none() {
                return Transition::rejected(state, Outcome::NotFound);
            }
            let mut next = state.clone();
            next.topics[index].tasks.retain(|task| task.id != task_id);
            Transition::applied(next)
        }
        Action::LoadState(loaded) => Transition::applied(loaded),
    }
}

fn topic_index(state: &State, topic_id: &str) -> Option<usize> {
    state.topics.iter().position(|topic| topic.id == topic_id)
}

fn validate_topic(topic: &Topic) -> std::result::Result<(), String> {
    if topic.title.trim().is_empty() {
        return Err("topic title cannot be empty".to_string());
    }
    for (idx, task) in topic.tasks.iter().enumerate() {
        let rest = &topic.tasks[idx + 1..];
        if rest.iter().any(|other| other.id == task.id) {
            return Err(format!("duplicate topic task id {}", task.id));
        }
        let lowered = task.title.to_lowercase();
        if rest.iter().any(|other| other.title.to_lowercase() == lowered) {
            return Err(format!("duplicate topic task title '{}'", task.title));
        }
    }
    Ok(())
}

/// Live task state backed by the `task-state` slot.
#[derive(Debug)]
pub struct TaskStore {
    storage: Storage,
    state: State,
}

impl TaskStore {
    /// Rehydrate from storage. Missing or unreadable snapshots start empty.
    pub fn open(storage: Storage) -> Self {
        let mut store = Self {
            storage,
            state: State::default(),
        };
        if let Some(loaded) = store.storage.load_state() {
            store.state = apply(&store.state, Action::LoadState(loaded)).state;
        }
        tracing::debug!(
            tasks = store.state.tasks.len(),
            topics = store.state.topics.len(),
            "task state loaded"
        );
        store
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Run the reducer and persist the resulting snapshot.
    ///
    /// Every action except `LoadState` is persisted, including ones the
    /// reducer rejected. The in-memory state only advances once the write
    /// has succeeded.
    pub fn dispatch(&mut self, action: Action) -> Result<Outcome> {
        let name = action.name();
        let persists = action.persists();
        let Transition { state, outcome } = apply(&self.state, action);

        if persists {
            self.storage.save_state(&state)?;
        }
        self.state = state;

        match &outcome {
            Outcome::Applied => tracing::debug!(action = name, "action applied"),
            other => tracing::info!(action = name, outcome = ?other, "action rejected"),
        }
        Ok(outcome)
    }

    /// Schedule a backlog item on `date` at `time`.
    ///
    /// Appends one new task copied from the topic task and marks the topic
    /// task as added to the daily plan, persisting both with a single write.
    /// Returns the new task id.
    pub fn promote(
        &mut self,
        topic_id: &str,
        topic_task_id: &str,
        date: DayKey,
        time: &str,
    ) -> Result<String> {
        let source = self
            .state
            .topic_task(topic_id, topic_task_id)
            .ok_or_else(|| Error::TopicTaskNotFound {
                topic_id: topic_id.to_string(),
                task_id: topic_task_id.to_string(),
            })?;
        let task = Task::from_topic_task(source, date, time);
        let task_id = task.id.clone();

        let added = apply(&self.state, Action::AddTask(task));
        match added.outcome {
            Outcome::Applied => {}
            Outcome::Invalid { reason } => return Err(Error::InvalidArgument(reason)),
            other => {
                return Err(Error::OperationFailed(format!(
                    "promoted task was not added: {other:?}"
                )))
            }
        }
        let marked = apply(
            &added.state,
            Action::UpdateTopicTask {
                topic_id: topic_id.to_string(),
                task_id: topic_task_id.to_string(),
                patch: TopicTaskPatch::added_to_daily(),
            },
        );
        if !marked.outcome.is_applied() {
            return Err(Error::OperationFailed(format!(
                "topic task was not marked: {:?}",
                marked.outcome
            )));
        }

        // Both changes land in one snapshot.
        self.storage.save_state(&marked.state)?;
        self.state = marked.state;

        tracing::info!(topic_id, topic_task_id, task_id = %task_id, %date, "topic task promoted");
        Ok(task_id)
    }

    pub fn resolve_task_id(&self, input: &str) -> Result<String> {
        resolve_prefix(
            "task",
            input,
            self.state.tasks.iter().map(|task| task.id.as_str()),
        )?
        .ok_or_else(|| Error::TaskNotFound(input.trim().to_string()))
    }

    pub fn resolve_topic_id(&self, input: &str) -> Result<String> {
        resolve_prefix(
            "topic",
            input,
            self.state.topics.iter().map(|topic| topic.id.as_str()),
        )?
        .ok_or_else(|| Error::TopicNotFound(input.trim().to_string()))
    }

    pub fn resolve_topic_task_id(&self, topic_id: &str, input: &str) -> Result<String> {
        let topic = self
            .state
            .topic(topic_id)
            .ok_or_else(|| Error::TopicNotFound(topic_id.to_string()))?;
        resolve_prefix(
            "topic task",
            input,
            topic.tasks.iter().map(|task| task.id.as_str()),
        )?
        .ok_or_else(|| Error::TopicTaskNotFound {
            topic_id: topic_id.to_string(),
            task_id: input.trim().to_string(),
        })
    }
}

/// Exact id or unique prefix; `Ok(None)` when nothing matches.
fn resolve_prefix<'a>(
    kind: &str,
    input: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<Option<String>> {
    let trimmed = input.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{kind} id cannot be empty")));
    }

    let mut matches: Vec<&str> = Vec::new();
    for id in ids {
        let normalized = id.to_ascii_lowercase();
        if normalized == trimmed {
            return Ok(Some(id.to_string()));
        }
        if normalized.starts_with(&trimmed) {
            matches.push(id);
        }
    }

    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only.to_string())),
        many => Err(Error::InvalidArgument(format!(
            "ambiguous {kind} id '{}': {}",
            input.trim(),
            many.join(", ")
        ))),
    }
}
