//! Upload task record and its lifecycle transitions.
//!
//! Transitions are only reachable from inside the crate; callers see cloned
//! [`Task`] snapshots handed out by the orchestrator.

use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, MimeKind};

/// Opaque task identifier (UUID v4 string).
pub type TaskId = String;

/// Message stored on tasks cancelled through `cancel_all`.
pub const CANCELLED_MESSAGE: &str = "cancelled by user";

/// Progress reported while uploading never reaches 100; only completion does.
const MAX_IN_FLIGHT_PERCENT: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Uploading,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Uploading => "uploading",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        }
    }

    /// True for states that can enter `Uploading` (a fresh start or a retry).
    pub fn is_startable(self) -> bool {
        matches!(self, TaskState::Pending | TaskState::Failed)
    }
}

/// One file's transfer lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub display_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub mime_kind: MimeKind,
    pub state: TaskState,
    /// 0..=100; 100 only when `state == Completed`.
    pub progress_percent: u8,
    pub speed_bytes_per_sec: Option<f64>,
    /// Set for `Failed` and `Cancelled` tasks.
    pub error_message: Option<String>,
    /// Set only for `Completed` tasks.
    pub result_ref: Option<String>,
    /// Locator of the task's local preview resource, if one was created.
    pub preview: Option<String>,
    /// Number of times the task entered `Uploading`.
    pub attempts: u32,
}

impl Task {
    pub fn new(candidate: &Candidate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: candidate.name.clone(),
            size_bytes: candidate.size_bytes,
            mime_type: candidate.mime_type.clone(),
            mime_kind: candidate.kind(),
            state: TaskState::Pending,
            progress_percent: 0,
            speed_bytes_per_sec: None,
            error_message: None,
            result_ref: None,
            preview: None,
            attempts: 0,
        }
    }

    /// Pending/Failed -> Uploading. Resets progress and clears the previous error.
    pub(crate) fn begin_attempt(&mut self) -> bool {
        if !self.state.is_startable() {
            return false;
        }
        self.state = TaskState::Uploading;
        self.progress_percent = 0;
        self.speed_bytes_per_sec = None;
        self.error_message = None;
        self.result_ref = None;
        self.attempts += 1;
        true
    }

    /// Applies a progress report. Percent is capped below 100 and never moves
    /// backwards within an attempt. Returns true if anything changed.
    pub(crate) fn apply_progress(&mut self, percent: u8, bytes_per_sec: Option<f64>) -> bool {
        if self.state != TaskState::Uploading {
            return false;
        }
        let percent = percent.min(MAX_IN_FLIGHT_PERCENT).max(self.progress_percent);
        let speed = bytes_per_sec
            .filter(|s| s.is_finite() && *s >= 0.0)
            .or(self.speed_bytes_per_sec);
        if percent == self.progress_percent && speed == self.speed_bytes_per_sec {
            return false;
        }
        self.progress_percent = percent;
        self.speed_bytes_per_sec = speed;
        true
    }

    pub(crate) fn complete(&mut self, result_ref: String) -> bool {
        if self.state != TaskState::Uploading {
            return false;
        }
        self.state = TaskState::Completed;
        self.progress_percent = 100;
        self.result_ref = Some(result_ref);
        self.error_message = None;
        true
    }

    pub(crate) fn fail(&mut self, message: String) -> bool {
        if self.state != TaskState::Uploading {
            return false;
        }
        self.state = TaskState::Failed;
        self.error_message = Some(message);
        self.result_ref = None;
        true
    }

    pub(crate) fn cancel(&mut self) -> bool {
        if !matches!(self.state, TaskState::Pending | TaskState::Uploading) {
            return false;
        }
        self.state = TaskState::Cancelled;
        self.error_message = Some(CANCELLED_MESSAGE.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new(&Candidate::from_bytes("a.png", "image/png", vec![0; 10]))
    }

    #[test]
    fn new_task_is_pending() {
        let t = task();
        assert_eq!(t.state, TaskState::Pending);
        assert_eq!(t.progress_percent, 0);
        assert_eq!(t.mime_kind, MimeKind::Image);
        assert_eq!(t.size_bytes, 10);
        assert!(t.result_ref.is_none() && t.error_message.is_none());
        assert_ne!(t.id, task().id);
    }

    #[test]
    fn progress_capped_and_monotonic() {
        let mut t = task();
        assert!(!t.apply_progress(10, None), "pending ignores progress");
        assert!(t.begin_attempt());
        assert!(t.apply_progress(40, Some(100.0)));
        assert!(!t.apply_progress(20, None));
        assert_eq!(t.progress_percent, 40);
        assert!(t.apply_progress(100, None));
        assert_eq!(t.progress_percent, 99);
        assert_eq!(t.speed_bytes_per_sec, Some(100.0));
        assert!(!t.apply_progress(99, Some(f64::NAN)));
    }

    #[test]
    fn complete_sets_result_and_full_progress() {
        let mut t = task();
        assert!(!t.complete("x".into()), "cannot complete before uploading");
        t.begin_attempt();
        assert!(t.complete("https://cdn/x.png".into()));
        assert_eq!(t.state, TaskState::Completed);
        assert_eq!(t.progress_percent, 100);
        assert_eq!(t.result_ref.as_deref(), Some("https://cdn/x.png"));
        assert!(!t.begin_attempt(), "completed is terminal");
    }

    #[test]
    fn fail_then_retry_clears_error() {
        let mut t = task();
        t.begin_attempt();
        t.apply_progress(50, None);
        assert!(t.fail("boom".into()));
        assert_eq!(t.error_message.as_deref(), Some("boom"));
        assert!(t.begin_attempt());
        assert_eq!(t.state, TaskState::Uploading);
        assert_eq!(t.progress_percent, 0);
        assert!(t.error_message.is_none());
        assert_eq!(t.attempts, 2);
    }

    #[test]
    fn cancel_only_from_pending_or_uploading() {
        let mut t = task();
        t.begin_attempt();
        assert!(t.cancel());
        assert_eq!(t.error_message.as_deref(), Some(CANCELLED_MESSAGE));
        assert!(!t.cancel());
        assert!(!t.begin_attempt(), "cancelled is terminal");
        assert!(!t.complete("late".into()));
    }
}
