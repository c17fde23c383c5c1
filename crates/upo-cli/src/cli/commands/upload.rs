//! `upo upload` – validate, upload and report.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use upo_core::config::{DispatchStrategy, OrchestratorConfig, UpoConfig};
use upo_core::transfer::{HttpTransfer, SimulatedTransfer, TransferClient};
use upo_core::{format_size, Event, Orchestrator, Statistics, TaskState};

use super::{load_candidates, print_unreadable};

const PROGRESS_INTERVAL_MS: u64 = 500;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct UploadOverrides {
    pub max_concurrent: Option<usize>,
    pub pool: bool,
    pub endpoint: Option<String>,
}

impl UploadOverrides {
    pub fn apply(&self, cfg: &mut UpoConfig) {
        if let Some(n) = self.max_concurrent {
            cfg.orchestrator.max_concurrent = n;
        }
        if self.pool {
            cfg.orchestrator.dispatch = DispatchStrategy::Pool;
        }
        if let Some(url) = &self.endpoint {
            cfg.http.endpoint = Some(url.clone());
        }
    }
}

fn transfer_client(cfg: &UpoConfig, simulate: bool) -> Result<Arc<dyn TransferClient>> {
    if simulate {
        return Ok(Arc::new(SimulatedTransfer::new(&cfg.simulation)));
    }
    let client = HttpTransfer::from_config(&cfg.http)
        .context("no usable upload endpoint (set [http].endpoint or pass --endpoint)")?;
    Ok(Arc::new(client))
}

fn progress_line(stats: &Statistics) -> String {
    let settled = stats.completed + stats.failed + stats.cancelled;
    let eta = if stats.uploading > 0 && stats.estimated_remaining_secs > 0 {
        format!("{}s", stats.estimated_remaining_secs)
    } else {
        "?".to_string()
    };
    format!(
        "  {}/{} files  {} / {} ({}%)  {}/s  ETA {}",
        settled,
        stats.total_tasks,
        format_size(stats.transferred_bytes),
        format_size(stats.total_bytes),
        stats.overall_progress_percent,
        format_size(stats.average_speed as u64),
        eta
    )
}

/// Runs every pending task, printing progress at most once per `interval`,
/// then a line for the final totals. Returns the printed lines.
async fn run_with_progress(orch: &Orchestrator, interval: Duration) -> Vec<String> {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<Statistics>(16);
    let subscription = orch.subscribe(move |event: &Event| {
        // Dropped when the printer lags; later events carry newer totals.
        let _ = progress_tx.try_send(event.snapshot.statistics.clone());
    });
    let printer = tokio::spawn(async move {
        let mut printed = Vec::new();
        let mut last_print = Instant::now();
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print) >= interval {
                let line = progress_line(&stats);
                println!("{}", line);
                printed.push(line);
                last_print = now;
            }
        }
        printed
    });

    orch.start_all(None).await;
    orch.unsubscribe(subscription);
    let mut printed = printer.await.unwrap_or_default();
    // The channel may have dropped the last event; report final totals directly.
    let last = progress_line(&orch.statistics());
    println!("{}", last);
    printed.push(last);
    printed
}

pub async fn run_upload(cfg: &UpoConfig, paths: &[PathBuf], simulate: bool) -> Result<()> {
    let client = transfer_client(cfg, simulate)?;
    // Enqueue first so rejections print before any transfer starts.
    let orch_cfg = OrchestratorConfig {
        auto_start: false,
        ..cfg.orchestrator.clone()
    };
    let orch = Orchestrator::new(orch_cfg, client);

    let (candidates, unreadable) = load_candidates(paths).await;
    let outcome = orch.enqueue(candidates).await;
    for r in &outcome.rejected {
        println!("{:<10} {}  ({})", "rejected", r.name, r.reason);
    }
    print_unreadable(&unreadable);
    if outcome.accepted.is_empty() {
        bail!("nothing to upload");
    }

    let run_cfg = orch.config();
    println!(
        "uploading {} file(s), {} at a time ({:?})",
        outcome.accepted.len(),
        run_cfg.concurrency(),
        run_cfg.dispatch
    );

    let started = Instant::now();
    run_with_progress(&orch, Duration::from_millis(PROGRESS_INTERVAL_MS)).await;

    println!("{:<10} {:<10} {:<30} {}", "STATE", "SIZE", "NAME", "RESULT");
    for task in orch.tasks() {
        let detail = match task.state {
            TaskState::Completed => task.result_ref.unwrap_or_default(),
            _ => task.error_message.unwrap_or_default(),
        };
        println!(
            "{:<10} {:<10} {:<30} {}",
            task.state.as_str(),
            format_size(task.size_bytes),
            task.display_name,
            detail
        );
    }

    let stats = orch.statistics();
    tracing::info!(
        completed = stats.completed,
        failed = stats.failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "upload run finished"
    );
    println!(
        "{} uploaded, {} failed, {} rejected, {} unreadable",
        stats.completed,
        stats.failed,
        outcome.rejected.len(),
        unreadable.len()
    );

    let not_uploaded = stats.failed + stats.cancelled + outcome.rejected.len() + unreadable.len();
    if not_uploaded > 0 {
        bail!("{} file(s) were not uploaded", not_uploaded);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let mut cfg = UpoConfig::default();
        UploadOverrides {
            max_concurrent: Some(7),
            pool: true,
            endpoint: Some("http://localhost:8080/upload".into()),
        }
        .apply(&mut cfg);
        assert_eq!(cfg.orchestrator.max_concurrent, 7);
        assert_eq!(cfg.orchestrator.dispatch, DispatchStrategy::Pool);
        assert_eq!(cfg.http.endpoint.as_deref(), Some("http://localhost:8080/upload"));
    }

    #[test]
    fn empty_overrides_keep_config() {
        let mut cfg = UpoConfig::default();
        UploadOverrides::default().apply(&mut cfg);
        assert_eq!(cfg, UpoConfig::default());
    }

    #[test]
    fn http_client_needs_endpoint() {
        let cfg = UpoConfig::default();
        assert!(transfer_client(&cfg, false).is_err());
        assert!(transfer_client(&cfg, true).is_ok());
    }

    #[tokio::test]
    async fn final_totals_are_printed_even_when_events_are_dropped() {
        let client = Arc::new(SimulatedTransfer::new(&upo_core::config::SimulationConfig {
            step_percent: 100,
            tick_millis: 1,
        }));
        let orch = Orchestrator::new(
            OrchestratorConfig {
                auto_start: false,
                max_tasks: 40,
                max_concurrent: 8,
                ..OrchestratorConfig::default()
            },
            client,
        );
        let files = (0..40)
            .map(|i| upo_core::Candidate::from_bytes(format!("f{i}.png"), "image/png", vec![1; 64]))
            .collect();
        assert_eq!(orch.enqueue(files).await.accepted.len(), 40);

        // Far more events than the channel holds, and a throttle that never fires.
        let printed = run_with_progress(&orch, Duration::from_secs(3600)).await;
        assert_eq!(printed.len(), 1);
        assert!(printed[0].contains("40/40 files"), "{}", printed[0]);
        assert!(printed[0].contains("(100%)"), "{}", printed[0]);
    }

    #[test]
    fn progress_line_shows_counts_and_sizes() {
        let stats = Statistics {
            total_tasks: 4,
            completed: 1,
            failed: 1,
            uploading: 2,
            total_bytes: 2048,
            transferred_bytes: 1024,
            overall_progress_percent: 50,
            average_speed: 512.0,
            estimated_remaining_secs: 2,
            ..Statistics::default()
        };
        let line = progress_line(&stats);
        assert!(line.contains("2/4 files"), "{line}");
        assert!(line.contains("1 KB / 2 KB (50%)"), "{line}");
        assert!(line.contains("ETA 2s"), "{line}");
    }
}
