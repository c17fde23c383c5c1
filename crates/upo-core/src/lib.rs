pub mod candidate;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod resource;
pub mod stats;
pub mod task;
pub mod transfer;
pub mod validate;

pub use candidate::{format_size, Candidate, MimeKind};
pub use orchestrator::{EnqueueOutcome, Event, EventKind, Orchestrator, Rejection, Snapshot};
pub use stats::Statistics;
pub use task::{Task, TaskId, TaskState};
