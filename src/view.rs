//! The derived view: filter, search and priority sort over the store.

use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [FilterMode::All, FilterMode::Active, FilterMode::Completed];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Completed,
            Self::Completed => Self::All,
        }
    }

    pub fn admits(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!(
                "invalid filter: '{other}' (must be one of: all, active, completed)"
            )),
        }
    }
}

/// Display-only state: which tasks to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filter: FilterMode,
    pub query: String,
}

impl ViewState {
    pub fn project<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        project(tasks, self.filter, &self.query)
    }
}

/// Tasks admitted by `mode` whose text or tag contains `query`, highest
/// priority first. Ties keep insertion order.
pub fn project<'a>(tasks: &'a [Task], mode: FilterMode, query: &str) -> Vec<&'a Task> {
    let needle = query.to_lowercase();
    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|t| mode.admits(t) && t.matches(&needle))
        .collect();
    // sort_by_key is stable
    view.sort_by_key(|t| Reverse(t.priority.rank()));
    view
}
