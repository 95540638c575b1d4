//! Persistent key-value storage for the task list.
//!
//! Two keys are used: [`TASKS_KEY`] holds the JSON-encoded collection inside a
//! versioned envelope and [`THEME_KEY`] holds the theme preference. Values are
//! overwritten wholesale after every mutation.

use crate::error::Result;
use crate::task::{Task, TaskId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Key holding the task collection.
pub const TASKS_KEY: &str = "neoTasks";
/// Key holding the theme preference.
pub const THEME_KEY: &str = "neoTheme";
/// Version written into the persisted envelope.
pub const SCHEMA_VERSION: u32 = 1;

/// A string-to-string store that survives restarts.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "wrote key");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes fail with a permission error.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "store is read-only",
            )
            .into());
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    tasks: &'a [Task],
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    tasks: Vec<Task>,
}

/// Encode the collection as the current envelope version.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        version: SCHEMA_VERSION,
        tasks,
    })?)
}

/// Write the collection under [`TASKS_KEY`].
///
/// # Errors
///
/// Returns an error if encoding or the backend write fails.
pub fn save_tasks(kv: &mut dyn KeyValueStore, tasks: &[Task]) -> Result<()> {
    let encoded = encode_tasks(tasks)?;
    kv.set(TASKS_KEY, &encoded)
}

/// Read the collection from [`TASKS_KEY`].
///
/// Never fails: unreadable, corrupted or too-new data yields an empty list
/// and a warning. A bare JSON array is read as version 0.
pub fn load_tasks(kv: &dyn KeyValueStore) -> Vec<Task> {
    let raw = match kv.get(TASKS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(error = %err, "could not read stored tasks, starting empty");
            return Vec::new();
        }
    };

    let tasks = match decode_stored(&raw) {
        Ok(tasks) => tasks,
        Err(reason) => {
            warn!(%reason, "stored tasks are unusable, starting empty");
            return Vec::new();
        }
    };
    let tasks = drop_duplicate_ids(drop_blank_text(tasks));
    info!(count = tasks.len(), "loaded tasks");
    tasks
}

fn decode_stored(raw: &str) -> std::result::Result<Vec<Task>, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if value.is_array() {
        debug!("migrating unversioned task list");
        return serde_json::from_value(value).map_err(|e| e.to_string());
    }
    let envelope: Envelope = serde_json::from_value(value).map_err(|e| e.to_string())?;
    if envelope.version > SCHEMA_VERSION {
        return Err(format!(
            "schema version {} is newer than supported {SCHEMA_VERSION}",
            envelope.version
        ));
    }
    Ok(envelope.tasks)
}

fn drop_blank_text(tasks: Vec<Task>) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| {
            let blank = task.text.trim().is_empty();
            if blank {
                warn!(id = task.id, "dropping stored task with empty text");
            }
            !blank
        })
        .collect()
}

fn drop_duplicate_ids(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen: HashSet<TaskId> = HashSet::with_capacity(tasks.len());
    tasks
        .into_iter()
        .filter(|task| {
            let fresh = seen.insert(task.id);
            if !fresh {
                warn!(id = task.id, "dropping stored task with duplicate id");
            }
            fresh
        })
        .collect()
}
