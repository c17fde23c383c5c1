//! Candidate validation: count ceiling, size ceiling, allow-lists, duplicates.
//!
//! Pure functions; the orchestrator decides what to do with the verdicts.

use serde::Serialize;

use crate::candidate::{Candidate, MimeKind};
use crate::config::OrchestratorConfig;
use crate::task::Task;

/// Why a candidate was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("at most {max_tasks} files can be queued")]
    CountExceeded { max_tasks: usize },
    #[error("file is too large ({size_bytes} bytes, limit {max_bytes})")]
    TooLarge { size_bytes: u64, max_bytes: u64 },
    #[error("unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },
    #[error("file already added")]
    Duplicate,
}

/// Identity used for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileKey {
    name: String,
    size_bytes: u64,
}

/// Slots already taken and files already known when a candidate is checked.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    occupied: usize,
    known: Vec<FileKey>,
}

impl BatchContext {
    /// Context seeded from the tasks currently held by the orchestrator.
    pub fn new<'a>(existing: impl IntoIterator<Item = &'a Task>) -> Self {
        let known: Vec<FileKey> = existing
            .into_iter()
            .map(|t| FileKey {
                name: t.display_name.clone(),
                size_bytes: t.size_bytes,
            })
            .collect();
        Self {
            occupied: known.len(),
            known,
        }
    }

    /// Every examined candidate takes a slot; only accepted ones become known
    /// for duplicate checks.
    fn record(&mut self, candidate: &Candidate, accepted: bool) {
        self.occupied += 1;
        if accepted {
            self.known.push(FileKey {
                name: candidate.name.clone(),
                size_bytes: candidate.size_bytes,
            });
        }
    }

    fn contains(&self, candidate: &Candidate) -> bool {
        self.known
            .iter()
            .any(|k| k.name == candidate.name && k.size_bytes == candidate.size_bytes)
    }
}

/// Checks one candidate. The first failing check wins.
pub fn validate(
    candidate: &Candidate,
    ctx: &BatchContext,
    cfg: &OrchestratorConfig,
) -> Result<(), ValidationError> {
    if ctx.occupied >= cfg.max_tasks {
        return Err(ValidationError::CountExceeded {
            max_tasks: cfg.max_tasks,
        });
    }
    if candidate.size_bytes > cfg.max_file_size_bytes {
        return Err(ValidationError::TooLarge {
            size_bytes: candidate.size_bytes,
            max_bytes: cfg.max_file_size_bytes,
        });
    }
    if !type_allowed(candidate, cfg) {
        return Err(ValidationError::UnsupportedType {
            mime_type: candidate.mime_type.clone(),
        });
    }
    if ctx.contains(candidate) {
        return Err(ValidationError::Duplicate);
    }
    Ok(())
}

/// Checks a whole batch in order against `existing` plus earlier batch members.
pub fn validate_batch<'a>(
    candidates: &[Candidate],
    existing: impl IntoIterator<Item = &'a Task>,
    cfg: &OrchestratorConfig,
) -> Vec<Result<(), ValidationError>> {
    let mut ctx = BatchContext::new(existing);
    candidates
        .iter()
        .map(|c| {
            let verdict = validate(c, &ctx, cfg);
            ctx.record(c, verdict.is_ok());
            verdict
        })
        .collect()
}

fn type_allowed(candidate: &Candidate, cfg: &OrchestratorConfig) -> bool {
    if !cfg.allowed_mime_types.is_empty()
        && !cfg
            .allowed_mime_types
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(candidate.mime_type.trim()))
    {
        return false;
    }
    if !cfg.allowed_extensions.is_empty() {
        let Some(ext) = candidate.extension() else {
            return false;
        };
        if !cfg
            .allowed_extensions
            .iter()
            .any(|a| a.trim().trim_start_matches('.').eq_ignore_ascii_case(&ext))
        {
            return false;
        }
    }
    if !cfg.allowed_kinds.is_empty() {
        let kind: MimeKind = candidate.kind();
        if !cfg.allowed_kinds.contains(&kind) {
            return false;
        }
    }
    true
}
