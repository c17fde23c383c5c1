//! The task collection and every state change applied to it.
//!
//! Only reachable through the orchestrator's lock. Each upload attempt gets a
//! generation number; progress and results carrying a stale generation (or
//! addressed to a removed task) are dropped.

use crate::candidate::Source;
use crate::resource::ResourceHandle;
use crate::stats::{self, Statistics};
use crate::task::{Task, TaskId, TaskState};
use crate::transfer::{TransferError, TransferProgress, TransferRequest};

use super::events::Snapshot;

/// Failure text used when a transport error has no message of its own.
pub(super) const FALLBACK_ERROR: &str = "upload failed";

pub(super) struct Entry {
    pub(super) task: Task,
    source: Source,
    preview: Option<Box<dyn ResourceHandle>>,
    generation: u64,
}

impl Entry {
    pub(super) fn new(mut task: Task, source: Source, preview: Option<Box<dyn ResourceHandle>>) -> Self {
        task.preview = preview.as_ref().map(|p| p.locator());
        Self {
            task,
            source,
            preview,
            generation: 0,
        }
    }

    /// Releases the owned resource, if any. Call after the entry has left
    /// the registry.
    pub(super) fn release(self) {
        if let Some(handle) = self.preview {
            release_resource(&self.task.id, handle);
        }
    }
}

/// Failures are logged, never returned; they must not block removal.
pub(super) fn release_resource(owner: &str, handle: Box<dyn ResourceHandle>) {
    if let Err(e) = handle.release() {
        tracing::warn!(owner = %owner, "could not release local resource: {:#}", e);
    }
}

#[derive(Default)]
pub(super) struct Registry {
    entries: Vec<Entry>,
    stats: Statistics,
    next_generation: u64,
}

impl Registry {
    pub(super) fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().map(|e| &e.task)
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn get(&self, id: &str) -> Option<&Task> {
        self.entries.iter().find(|e| e.task.id == id).map(|e| &e.task)
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.task.id == id)
    }

    pub(super) fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub(super) fn refresh_stats(&mut self) {
        self.stats = stats::compute(self.tasks());
    }

    pub(super) fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks().cloned().collect(),
            statistics: self.stats.clone(),
        }
    }

    pub(super) fn insert(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub(super) fn take(&mut self, id: &str) -> Option<Entry> {
        let idx = self.entries.iter().position(|e| e.task.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub(super) fn take_all(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }

    /// Ids in insertion order whose task is in `state`.
    pub(super) fn ids_in_state(&self, state: TaskState) -> Vec<TaskId> {
        self.tasks()
            .filter(|t| t.state == state)
            .map(|t| t.id.clone())
            .collect()
    }

    /// The requested ids that exist, reordered to insertion order.
    pub(super) fn ordered_subset(&self, ids: &[TaskId]) -> Vec<TaskId> {
        self.tasks()
            .filter(|t| ids.iter().any(|id| *id == t.id))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Moves a startable task to `Uploading` and returns the request plus the
    /// attempt's generation.
    pub(super) fn begin(&mut self, id: &str) -> Option<(TransferRequest, u64)> {
        self.next_generation += 1;
        let generation = self.next_generation;
        let entry = self.entry_mut(id)?;
        if !entry.task.begin_attempt() {
            return None;
        }
        entry.generation = generation;
        let request = TransferRequest {
            task_id: entry.task.id.clone(),
            name: entry.task.display_name.clone(),
            mime_type: entry.task.mime_type.clone(),
            size_bytes: entry.task.size_bytes,
            source: entry.source.clone(),
        };
        Some((request, generation))
    }

    fn live_attempt(&mut self, id: &str, generation: u64) -> Option<&mut Entry> {
        self.entry_mut(id)
            .filter(|e| e.generation == generation && e.task.state == TaskState::Uploading)
    }

    pub(super) fn progress(&mut self, id: &str, generation: u64, p: TransferProgress) -> bool {
        match self.live_attempt(id, generation) {
            Some(entry) => entry.task.apply_progress(p.percent, p.bytes_per_sec),
            None => false,
        }
    }

    /// Records the outcome of an attempt. Returns the new state, or `None` if
    /// the attempt is no longer live (task removed, cancelled or restarted).
    pub(super) fn settle(
        &mut self,
        id: &str,
        generation: u64,
        outcome: Result<String, TransferError>,
    ) -> Option<TaskState> {
        let entry = self.live_attempt(id, generation)?;
        match outcome {
            Ok(result_ref) => {
                entry.task.complete(result_ref);
            }
            Err(e) => {
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    FALLBACK_ERROR.to_string()
                } else {
                    message
                };
                entry.task.fail(message);
            }
        }
        Some(entry.task.state)
    }

    /// Cancels every uploading task; returns their ids.
    pub(super) fn cancel_uploading(&mut self) -> Vec<TaskId> {
        self.entries
            .iter_mut()
            .filter(|e| e.task.state == TaskState::Uploading)
            .filter_map(|e| e.task.cancel().then(|| e.task.id.clone()))
            .collect()
    }
}
