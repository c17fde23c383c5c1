//! Aggregate statistics over the current task set.
//!
//! Recomputed by the orchestrator after every mutation; consumers can render
//! overall progress, throughput and ETA from a single snapshot.

use serde::Serialize;

use crate::task::{Task, TaskState};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_tasks: usize,
    pub pending: usize,
    pub uploading: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    /// Rounded percentage of `transferred_bytes` over `total_bytes` (0 when empty).
    pub overall_progress_percent: u8,
    /// Mean reported speed of uploading tasks, bytes per second.
    pub average_speed: f64,
    /// Seconds left at `average_speed` (0 when no speed is known).
    pub estimated_remaining_secs: u64,
}

impl Statistics {
    /// True when every task has settled and at least one exists.
    pub fn is_settled(&self) -> bool {
        self.total_tasks > 0 && self.pending == 0 && self.uploading == 0
    }
}

/// Bytes credited to a task: all of it when completed, the reported share
/// while uploading, nothing otherwise.
fn transferred(task: &Task) -> u64 {
    match task.state {
        TaskState::Completed => task.size_bytes,
        TaskState::Uploading => {
            (task.size_bytes as u128 * task.progress_percent as u128 / 100) as u64
        }
        _ => 0,
    }
}

pub fn compute<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Statistics {
    let mut stats = Statistics::default();
    let mut speed_sum = 0.0;
    let mut speed_count = 0usize;

    for task in tasks {
        stats.total_tasks += 1;
        stats.total_bytes += task.size_bytes;
        stats.transferred_bytes += transferred(task);
        match task.state {
            TaskState::Pending => stats.pending += 1,
            TaskState::Uploading => {
                stats.uploading += 1;
                if let Some(speed) = task.speed_bytes_per_sec {
                    speed_sum += speed;
                    speed_count += 1;
                }
            }
            TaskState::Completed => stats.completed += 1,
            TaskState::Failed => stats.failed += 1,
            TaskState::Cancelled => stats.cancelled += 1,
        }
    }

    if stats.total_bytes > 0 {
        let pct = 100.0 * stats.transferred_bytes as f64 / stats.total_bytes as f64;
        stats.overall_progress_percent = pct.round().min(100.0) as u8;
    }
    if speed_count > 0 {
        stats.average_speed = speed_sum / speed_count as f64;
    }
    if stats.average_speed > 0.0 {
        let remaining = stats.total_bytes.saturating_sub(stats.transferred_bytes);
        stats.estimated_remaining_secs = (remaining as f64 / stats.average_speed).ceil() as u64;
    }
    stats
}
