//! Upload orchestrator.
//!
//! Owns the task collection, validates and enqueues candidates, dispatches
//! transfers under the concurrency bound, and applies progress, results,
//! retries, cancellation and removal. Every mutation recomputes statistics
//! and notifies subscribers with a fresh [`Snapshot`].
//!
//! The collection sits behind a `std::sync::Mutex` that is never held across
//! an `.await` or for file I/O; that lock is the only mutation path. Previews
//! are built on the blocking pool before the inserts are committed, and
//! resources are released after the entry has left the collection. Transfer
//! failures are recorded on their task and never surface from
//! `start_all`/`start_one`, so a batch always settles.

mod dispatch;
mod events;
mod registry;

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::candidate::Candidate;
use crate::config::{DispatchStrategy, OrchestratorConfig};
use crate::resource::{PreviewProvider, ResourceHandle};
use crate::stats::Statistics;
use crate::task::{Task, TaskId, TaskState};
use crate::transfer::{ProgressCallback, TransferClient, TransferProgress};
use crate::validate::{self, ValidationError};

pub use events::{Event, EventKind, Listener, Snapshot, SubscriptionId};

use events::Listeners;
use registry::{Entry, Registry};

/// A candidate that did not become a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub name: String,
    pub size_bytes: u64,
    pub reason: ValidationError,
}

/// Result of [`Orchestrator::enqueue`]. Accepted tasks keep input order.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOutcome {
    pub accepted: Vec<Task>,
    pub rejected: Vec<Rejection>,
}

impl EnqueueOutcome {
    fn reject(&mut self, candidate: Candidate, reason: ValidationError) {
        tracing::debug!(name = %candidate.name, "rejected: {}", reason);
        self.rejected.push(Rejection {
            name: candidate.name,
            size_bytes: candidate.size_bytes,
            reason,
        });
    }
}

/// A provider error costs the task its preview, not its place in the queue.
fn create_preview(provider: &dyn PreviewProvider, candidate: &Candidate) -> Option<Box<dyn ResourceHandle>> {
    match provider.create(candidate) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(name = %candidate.name, "could not create preview: {:#}", e);
            None
        }
    }
}

struct Inner {
    config: OrchestratorConfig,
    client: Arc<dyn TransferClient>,
    previews: Option<Arc<dyn PreviewProvider>>,
    registry: Mutex<Registry>,
    listeners: Listeners,
}

/// Cheaply clonable handle; clones share the same task collection.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, client: Arc<dyn TransferClient>) -> Self {
        Self::build(config, client, None)
    }

    /// Like `new`, but each accepted candidate may get a preview resource
    /// owned by its task.
    pub fn with_previews(
        config: OrchestratorConfig,
        client: Arc<dyn TransferClient>,
        previews: Arc<dyn PreviewProvider>,
    ) -> Self {
        Self::build(config, client, Some(previews))
    }

    fn build(
        config: OrchestratorConfig,
        client: Arc<dyn TransferClient>,
        previews: Option<Arc<dyn PreviewProvider>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                client,
                previews,
                registry: Mutex::new(Registry::default()),
                listeners: Listeners::default(),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies one mutation under the lock, refreshes statistics, then
    /// notifies subscribers outside the lock. `None` from `f` means nothing
    /// changed and nobody is notified.
    fn commit<R>(&self, f: impl FnOnce(&mut Registry) -> Option<(R, EventKind)>) -> Option<R> {
        let (value, event) = {
            let mut registry = self.registry();
            let (value, kind) = f(&mut registry)?;
            registry.refresh_stats();
            let snapshot = Arc::new(registry.snapshot());
            (value, Event { kind, snapshot })
        };
        self.inner.listeners.notify(&event);
        Some(value)
    }

    /// Validates `candidates` in order against the current tasks and earlier
    /// members of the same batch, creating a pending task for each accepted
    /// one. With `auto_start`, also uploads the accepted tasks and returns
    /// once they have all settled.
    ///
    /// Admission is checked again when the tasks are inserted, since another
    /// `enqueue` may have taken slots while previews were being built.
    pub async fn enqueue(&self, candidates: Vec<Candidate>) -> EnqueueOutcome {
        let mut outcome = EnqueueOutcome::default();
        let verdicts =
            validate::validate_batch(&candidates, self.registry().tasks(), &self.inner.config);
        let mut admitted = Vec::with_capacity(candidates.len());
        for (candidate, verdict) in candidates.into_iter().zip(verdicts) {
            match verdict {
                Ok(()) => admitted.push(candidate),
                Err(reason) => outcome.reject(candidate, reason),
            }
        }

        let previews = self.create_previews(&admitted).await;
        let mut stale = Vec::new();
        let ids = self.commit(|registry| {
            let verdicts = validate::validate_batch(&admitted, registry.tasks(), &self.inner.config);
            for ((candidate, preview), verdict) in admitted.into_iter().zip(previews).zip(verdicts) {
                if let Err(reason) = verdict {
                    stale.extend(preview.map(|p| (candidate.name.clone(), p)));
                    outcome.reject(candidate, reason);
                    continue;
                }
                let entry = Entry::new(Task::new(&candidate), candidate.source, preview);
                outcome.accepted.push(entry.task.clone());
                registry.insert(entry);
            }
            if outcome.accepted.is_empty() {
                return None;
            }
            let ids: Vec<TaskId> = outcome.accepted.iter().map(|t| t.id.clone()).collect();
            Some((ids.clone(), EventKind::Enqueued { ids }))
        });
        for (name, preview) in stale {
            registry::release_resource(&name, preview);
        }
        tracing::info!(
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "enqueued upload candidates"
        );

        if let Some(ids) = ids {
            if self.inner.config.auto_start {
                self.start_all(Some(&ids)).await;
                for task in &mut outcome.accepted {
                    if let Some(current) = self.task(&task.id) {
                        *task = current;
                    }
                }
            }
        }
        outcome
    }

    /// One preview slot per candidate, built on the blocking pool.
    async fn create_previews(&self, candidates: &[Candidate]) -> Vec<Option<Box<dyn ResourceHandle>>> {
        let none = || -> Vec<Option<Box<dyn ResourceHandle>>> { candidates.iter().map(|_| None).collect() };
        let Some(provider) = self.inner.previews.clone() else {
            return none();
        };
        if candidates.is_empty() {
            return Vec::new();
        }
        let batch = candidates.to_vec();
        let built = tokio::task::spawn_blocking(move || {
            batch
                .iter()
                .map(|c| create_preview(provider.as_ref(), c))
                .collect::<Vec<_>>()
        })
        .await;
        built.unwrap_or_else(|e| {
            tracing::warn!("preview creation aborted: {}", e);
            none()
        })
    }

    fn start_targets(&self, ids: Option<&[TaskId]>) -> Vec<TaskId> {
        let registry = self.registry();
        match ids {
            None => registry.ids_in_state(TaskState::Pending),
            Some(ids) => registry.ordered_subset(ids),
        }
    }

    /// Uploads `ids` (default: every pending task) in insertion order under
    /// the configured strategy. Returns when every targeted task has settled.
    pub async fn start_all(&self, ids: Option<&[TaskId]>) {
        let targets = self.start_targets(ids);
        if targets.is_empty() {
            return;
        }
        let width = self.inner.config.concurrency();
        let strategy = self.inner.config.dispatch;
        tracing::info!(count = targets.len(), width, ?strategy, "starting uploads");
        let run = move |id: TaskId| async move {
            self.start_one(&id).await;
        };
        match strategy {
            DispatchStrategy::Chunked => dispatch::run_chunked(targets, width, run).await,
            DispatchStrategy::Pool => dispatch::run_pooled(targets, width, run).await,
        }
    }

    /// Runs one upload attempt for a pending or failed task. Returns the
    /// settled state, or `None` if the task could not start or was cancelled
    /// or removed before the transfer finished.
    pub async fn start_one(&self, id: &str) -> Option<TaskState> {
        let (request, generation) = self.commit(|registry| {
            let begun = registry.begin(id)?;
            Some((begun, EventKind::Started { id: id.to_string() }))
        })?;
        tracing::debug!(task = %id, name = %request.name, generation, "upload started");

        let progress = self.progress_callback(id, generation);
        let outcome = self.inner.client.transfer(request, progress).await;
        if let Err(e) = &outcome {
            tracing::warn!(task = %id, "upload failed: {}", e);
        }

        let state = self.commit(|registry| {
            let state = registry.settle(id, generation, outcome)?;
            Some((
                state,
                EventKind::Settled {
                    id: id.to_string(),
                    state,
                },
            ))
        });
        match state {
            Some(state) => tracing::debug!(task = %id, state = state.as_str(), "upload settled"),
            None => tracing::debug!(task = %id, generation, "ignored result of a cancelled or removed upload"),
        }
        state
    }

    /// The callback holds a weak handle: a transport that keeps it around does
    /// not keep the orchestrator alive.
    fn progress_callback(&self, id: &str, generation: u64) -> ProgressCallback {
        let inner = Arc::downgrade(&self.inner);
        let id = id.to_string();
        Arc::new(move |progress: TransferProgress| {
            if let Some(inner) = inner.upgrade() {
                Orchestrator { inner }.on_progress(&id, generation, progress);
            }
        })
    }

    fn on_progress(&self, id: &str, generation: u64, progress: TransferProgress) {
        self.commit(|registry| {
            registry
                .progress(id, generation, progress)
                .then(|| ((), EventKind::Progress { id: id.to_string() }))
        });
    }

    /// Re-runs a failed task under the same id. No-op for any other state.
    pub async fn retry(&self, id: &str) -> Option<TaskState> {
        let failed = self.registry().get(id).map(|t| t.state) == Some(TaskState::Failed);
        if !failed {
            tracing::debug!(task = %id, "retry ignored: task is not failed");
            return None;
        }
        self.start_one(id).await
    }

    /// Marks every uploading task cancelled. Bookkeeping only: transports are
    /// not interrupted, and their eventual results are ignored.
    pub fn cancel_all(&self) -> Vec<TaskId> {
        let cancelled = self
            .commit(|registry| {
                let ids = registry.cancel_uploading();
                if ids.is_empty() {
                    return None;
                }
                Some((ids.clone(), EventKind::Cancelled { ids }))
            })
            .unwrap_or_default();
        if !cancelled.is_empty() {
            tracing::info!(count = cancelled.len(), "cancelled uploads");
        }
        cancelled
    }

    /// Drops the task and releases its local resource. Returns false if no
    /// such task exists.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.commit(|registry| {
            let entry = registry.take(id)?;
            if entry.task.state == TaskState::Uploading {
                tracing::debug!(task = %id, "removed while uploading; late results will be ignored");
            }
            Some((entry, EventKind::Removed { id: id.to_string() }))
        });
        match removed {
            Some(entry) => {
                entry.release();
                true
            }
            None => false,
        }
    }

    /// Removes every task. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let entries = self
            .commit(|registry| {
                let entries = registry.take_all();
                if entries.is_empty() {
                    return None;
                }
                let count = entries.len();
                Some((entries, EventKind::Cleared { count }))
            })
            .unwrap_or_default();
        let count = entries.len();
        for entry in entries {
            entry.release();
        }
        count
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.registry().tasks().cloned().collect()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.registry().get(id).cloned()
    }

    pub fn statistics(&self) -> Statistics {
        self.registry().statistics().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.registry().snapshot()
    }

    /// True while any task is uploading.
    pub fn is_busy(&self) -> bool {
        self.registry().statistics().uploading > 0
    }

    pub fn can_add_more(&self) -> bool {
        self.registry().len() < self.inner.config.max_tasks
    }

    /// Registers a listener called after every mutation.
    pub fn subscribe(&self, listener: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
        self.inner.listeners.add(Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.remove(id)
    }
}
