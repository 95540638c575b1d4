//! Completion counters for the progress ring and the stats line.

use crate::task::Task;

/// Dash length of the progress ring drawn by the web page.
pub const RING_CIRCUMFERENCE: f64 = 440.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            active: total - completed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Completed share in `0.0..=1.0`; an empty list counts as no progress.
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u16 {
        (self.ratio() * 100.0).round() as u16
    }

    /// Stroke offset of a ring of `circumference`: full when nothing is done.
    pub fn ring_offset(&self, circumference: f64) -> f64 {
        circumference - self.ratio() * circumference
    }

    /// `"{completed}/{total} items"`
    pub fn progress_label(&self) -> String {
        format!("{}/{} items", self.completed, self.total)
    }

    /// `"{active} active • {completed} done"`
    pub fn detail_label(&self) -> String {
        format!("{} active • {} done", self.active, self.completed)
    }
}
