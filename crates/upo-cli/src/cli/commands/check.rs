//! `upo check` – dry-run validation, no transfers.

use anyhow::{bail, Result};
use std::path::PathBuf;
use upo_core::config::OrchestratorConfig;
use upo_core::{format_size, validate};

use super::{load_candidates, print_unreadable};

pub async fn run_check(cfg: &OrchestratorConfig, paths: &[PathBuf]) -> Result<()> {
    let (candidates, unreadable) = load_candidates(paths).await;
    let verdicts = validate::validate_batch(&candidates, std::iter::empty(), cfg);

    println!("{:<10} {:<10} {:<10} {}", "VERDICT", "SIZE", "KIND", "NAME");
    let mut rejected = 0usize;
    for (candidate, verdict) in candidates.iter().zip(&verdicts) {
        let size = format_size(candidate.size_bytes);
        let kind = candidate.kind().as_str();
        match verdict {
            Ok(()) => println!("{:<10} {:<10} {:<10} {}", "ok", size, kind, candidate.name),
            Err(reason) => {
                rejected += 1;
                println!(
                    "{:<10} {:<10} {:<10} {}  ({})",
                    "rejected", size, kind, candidate.name, reason
                );
            }
        }
    }
    print_unreadable(&unreadable);

    let bad = rejected + unreadable.len();
    if bad > 0 {
        bail!("{} of {} file(s) would not be uploaded", bad, paths.len());
    }
    Ok(())
}
