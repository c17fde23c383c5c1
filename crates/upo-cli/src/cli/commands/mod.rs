//! CLI command handlers, one file per subcommand.

mod check;
mod config;
mod docs;
mod upload;

pub use check::run_check;
pub use config::run_config;
pub use docs::{run_completions, run_man};
pub use upload::{run_upload, UploadOverrides};

use std::path::PathBuf;
use upo_core::Candidate;

/// Reads metadata for each path in order. Paths that cannot be read are
/// returned separately with their error so callers can report them.
pub(crate) async fn load_candidates(
    paths: &[PathBuf],
) -> (Vec<Candidate>, Vec<(PathBuf, anyhow::Error)>) {
    let mut candidates = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match Candidate::from_path(path).await {
            Ok(c) => candidates.push(c),
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot read: {:#}", e);
                unreadable.push((path.clone(), e));
            }
        }
    }
    (candidates, unreadable)
}

pub(crate) fn print_unreadable(unreadable: &[(PathBuf, anyhow::Error)]) {
    for (path, err) in unreadable {
        println!("{:<10} {}  ({:#})", "unreadable", path.display(), err);
    }
}
