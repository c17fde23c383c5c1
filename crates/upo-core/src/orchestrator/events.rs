//! Change notifications for UI/CLI layers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::stats::Statistics;
use crate::task::{Task, TaskId, TaskState};

/// Consistent view of all tasks and their statistics at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub statistics: Statistics,
}

impl Snapshot {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Enqueued { ids: Vec<TaskId> },
    Started { id: TaskId },
    Progress { id: TaskId },
    Settled { id: TaskId, state: TaskState },
    Cancelled { ids: Vec<TaskId> },
    Removed { id: TaskId },
    Cleared { count: usize },
}

/// Delivered to every subscriber after each mutation.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub snapshot: Arc<Snapshot>,
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(super) struct Listeners {
    next_id: AtomicU64,
    entries: RwLock<Vec<(SubscriptionId, Listener)>>,
}

impl Listeners {
    pub(super) fn add(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub(super) fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(sid, _)| *sid != id);
        entries.len() != before
    }

    /// Calls listeners outside the registry lock so they may query the orchestrator.
    pub(super) fn notify(&self, event: &Event) {
        let listeners: Vec<Listener> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}
