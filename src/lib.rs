//! A personal task list: an owned store persisted to a key-value backend,
//! a filtered and priority-sorted view over it, and a terminal front end.

pub mod app;
pub mod config;
pub mod error;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;
pub mod theme;
pub mod ui;
pub mod view;

pub use error::{Error, ImportError, Result};
pub use stats::Stats;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{Confirm, StoreEvent, TaskStore};
pub use task::{NewTask, Priority, Task, TaskId};
pub use view::{project, FilterMode, ViewState};
