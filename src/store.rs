//! The authoritative task collection.
//!
//! [`TaskStore`] is the only owner of the task list. Every mutation goes
//! through one of its operations, which persists the whole collection and
//! then notifies subscribers with a [`StoreEvent`].

use crate::error::{ImportError, Result};
use crate::stats::Stats;
use crate::storage::{self, KeyValueStore};
use crate::task::{normalize_tag, NewTask, Priority, Task, TaskId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// File name of the exported backup.
pub const EXPORT_FILE_NAME: &str = "neo_tasks_backup.json";

/// Question asked before [`TaskStore::clear_all`] empties the list.
pub const CLEAR_PROMPT: &str = "Really delete every task?";

/// Asks the user to confirm a destructive operation.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Emitted once per mutation, after the collection was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(TaskId),
    Toggled(TaskId),
    Deleted(TaskId),
    Edited(TaskId),
    MarkedAll,
    Cleared,
    Imported(usize),
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

pub struct TaskStore {
    tasks: Vec<Task>,
    backend: Box<dyn KeyValueStore>,
    listeners: Vec<Listener>,
    revision: u64,
    clock: fn() -> DateTime<Utc>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl TaskStore {
    /// Open the store, reading whatever the backend holds.
    ///
    /// Unreadable data is logged and replaced by an empty list.
    pub fn open(backend: Box<dyn KeyValueStore>) -> Self {
        let tasks = storage::load_tasks(backend.as_ref());
        Self {
            tasks,
            backend,
            listeners: Vec::new(),
            revision: 0,
            clock: Utc::now,
        }
    }

    /// Replace the time source used for ids and `createdAt`.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Call `listener` after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Number of mutations applied since the store was opened.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Counts over the whole collection, ignoring any filter.
    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    pub fn backend_mut(&mut self) -> &mut dyn KeyValueStore {
        self.backend.as_mut()
    }

    /// Append a task. Returns `None` without touching anything when the text is blank.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection could not be persisted.
    pub fn add(&mut self, new_task: NewTask) -> Result<Option<TaskId>> {
        let now = (self.clock)();
        let id = self.next_id(now);
        let Some(task) = new_task.into_task(id, now) else {
            debug!("ignoring task with blank text");
            return Ok(None);
        };
        self.tasks.push(task);
        self.commit(StoreEvent::Added(id))?;
        Ok(Some(id))
    }

    /// Flip `completed`. Returns `false` when no task has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection could not be persisted.
    pub fn toggle(&mut self, id: TaskId) -> Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle on unknown task");
            return Ok(false);
        };
        task.completed = !task.completed;
        self.commit(StoreEvent::Toggled(id))?;
        Ok(true)
    }

    /// Remove a task. Returns `false` when no task has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection could not be persisted.
    pub fn delete(&mut self, id: TaskId) -> Result<bool> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "delete on unknown task");
            return Ok(false);
        };
        self.tasks.remove(index);
        self.commit(StoreEvent::Deleted(id))?;
        Ok(true)
    }

    /// Replace the text of a task in place.
    ///
    /// Blank or unchanged text, and unknown ids, are ignored and return `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection could not be persisted.
    pub fn edit_text(&mut self, id: TaskId, text: &str) -> Result<bool> {
        let text = text.trim();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        if text.is_empty() || text == task.text {
            return Ok(false);
        }
        task.text = text.to_string();
        self.commit(StoreEvent::Edited(id))?;
        Ok(true)
    }

    /// Mark every task completed. Returns how many were still active.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection could not be persisted.
    pub fn mark_all_completed(&mut self) -> Result<usize> {
        let mut changed = 0;
        for task in self.tasks.iter_mut().filter(|t| !t.completed) {
            task.completed = true;
            changed += 1;
        }
        self.commit(StoreEvent::MarkedAll)?;
        Ok(changed)
    }

    /// Empty the collection once `confirm` agrees. Returns whether it did.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection could not be persisted.
    pub fn clear_all(&mut self, confirm: &mut impl Confirm) -> Result<bool> {
        if !confirm.confirm(CLEAR_PROMPT) {
            return Ok(false);
        }
        self.tasks.clear();
        self.commit(StoreEvent::Cleared)?;
        Ok(true)
    }

    /// Replace the whole collection with the tasks in `payload`.
    ///
    /// The payload must be a JSON array of task records, or a versioned
    /// envelope. Any malformed record rejects the whole import and leaves the
    /// store unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Import`] when the payload is rejected, or an
    /// I/O error if the new collection could not be persisted.
    pub fn import(&mut self, payload: &[u8]) -> Result<usize> {
        let tasks = parse_import(payload, (self.clock)())?;
        let count = tasks.len();
        self.tasks = tasks;
        info!(count, "imported tasks");
        self.commit(StoreEvent::Imported(count))?;
        Ok(count)
    }

    /// The collection as a JSON array, exactly as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.tasks)?)
    }

    /// Write [`Self::export`] to `dir/neo_tasks_backup.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(EXPORT_FILE_NAME);
        fs::write(&path, self.export()?)?;
        info!(path = %path.display(), count = self.tasks.len(), "exported tasks");
        Ok(path)
    }

    fn next_id(&self, now: DateTime<Utc>) -> TaskId {
        let millis = TaskId::try_from(now.timestamp_millis()).unwrap_or(0);
        match self.tasks.iter().map(|t| t.id).max() {
            Some(max) if max >= millis => max
                .checked_add(1)
                .unwrap_or_else(|| self.lowest_free_id()),
            _ => millis,
        }
    }

    /// Smallest id not taken; only reached once an id sits at `TaskId::MAX`.
    fn lowest_free_id(&self) -> TaskId {
        let used: HashSet<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        (0..=TaskId::MAX)
            .find(|id| !used.contains(id))
            .unwrap_or_default()
    }

    fn commit(&mut self, event: StoreEvent) -> Result<()> {
        self.revision += 1;
        debug!(?event, revision = self.revision, "store changed");
        let saved = storage::save_tasks(self.backend.as_mut(), &self.tasks);
        if let Err(err) = &saved {
            error!(error = %err, "failed to persist tasks");
        }
        for listener in &mut self.listeners {
            listener(&event);
        }
        saved
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRecord {
    id: TaskId,
    text: String,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    completed: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

fn parse_import(payload: &[u8], now: DateTime<Utc>) -> std::result::Result<Vec<Task>, ImportError> {
    let payload = payload.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(payload);
    let value: Value = serde_json::from_slice(payload).map_err(ImportError::Decode)?;
    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut map) if map.contains_key("version") => match map.remove("tasks") {
            Some(Value::Array(records)) => records,
            _ => return Err(ImportError::NotASequence),
        },
        _ => return Err(ImportError::NotASequence),
    };

    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let task = validate_record(record, now)
                .map_err(|reason| ImportError::InvalidRecord { index, reason })?;
            if !seen.insert(task.id) {
                return Err(ImportError::DuplicateId(task.id));
            }
            Ok(task)
        })
        .collect()
}

fn validate_record(record: Value, now: DateTime<Utc>) -> std::result::Result<Task, String> {
    let record: ImportRecord = serde_json::from_value(record).map_err(|e| e.to_string())?;
    if record.text.trim().is_empty() {
        return Err("text is empty".to_string());
    }
    Ok(Task {
        id: record.id,
        text: record.text,
        priority: record.priority.unwrap_or_default(),
        tag: normalize_tag(record.tag.as_deref().unwrap_or_default()),
        due_date: record.due_date,
        completed: record.completed,
        created_at: record.created_at.unwrap_or(now),
    })
}
