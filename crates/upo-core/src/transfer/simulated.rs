//! Timer-driven fake transport for demos and UI testing.
//!
//! Advances a fixed percentage per tick and reports a steady speed, then
//! returns a `sim://` reference. Names registered with `failing_on` fail
//! halfway through.

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::SimulationConfig;

use super::{ProgressCallback, TransferClient, TransferError, TransferProgress, TransferRequest};

#[derive(Debug, Clone)]
pub struct SimulatedTransfer {
    step_percent: u8,
    tick: Duration,
    failing: HashSet<String>,
}

impl SimulatedTransfer {
    pub fn new(cfg: &SimulationConfig) -> Self {
        Self {
            step_percent: cfg.step_percent.clamp(1, 100),
            tick: Duration::from_millis(cfg.tick_millis),
            failing: HashSet::new(),
        }
    }

    /// Makes transfers of `name` fail at 50%.
    pub fn failing_on(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    fn bytes_per_sec(&self, size_bytes: u64) -> Option<f64> {
        let secs = self.tick.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }
        Some(size_bytes as f64 * f64::from(self.step_percent) / 100.0 / secs)
    }
}

impl Default for SimulatedTransfer {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

#[async_trait]
impl TransferClient for SimulatedTransfer {
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressCallback,
    ) -> Result<String, TransferError> {
        let fails = self.failing.contains(&request.name);
        let speed = self.bytes_per_sec(request.size_bytes);
        let mut percent = 0u8;
        while percent < 100 {
            tokio::time::sleep(self.tick).await;
            percent = percent.saturating_add(self.step_percent).min(100);
            if fails && percent >= 50 {
                return Err(TransferError::other(format!(
                    "simulated failure at {percent}%"
                )));
            }
            progress(TransferProgress {
                percent,
                bytes_per_sec: speed,
            });
        }
        Ok(format!("sim://{}/{}", request.task_id, request.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Source;
    use std::sync::{Arc, Mutex};

    fn request(name: &str) -> TransferRequest {
        TransferRequest {
            task_id: "t1".into(),
            name: name.into(),
            mime_type: "image/png".into(),
            size_bytes: 1000,
            source: Source::Memory(Arc::from(vec![0u8; 1000])),
        }
    }

    fn fast() -> SimulatedTransfer {
        SimulatedTransfer::new(&SimulationConfig {
            step_percent: 25,
            tick_millis: 1,
        })
    }

    #[tokio::test]
    async fn reports_steps_and_returns_reference() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p.percent));
        let result = fast().transfer(request("a.png"), cb).await.unwrap();
        assert_eq!(result, "sim://t1/a.png");
        assert_eq!(*seen.lock().unwrap(), vec![25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn failing_name_errors_midway() {
        let cb: ProgressCallback = Arc::new(|_| {});
        let err = fast()
            .failing_on("bad.png")
            .transfer(request("bad.png"), cb)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("simulated failure"));
    }

    #[test]
    fn speed_from_step_and_tick() {
        let sim = SimulatedTransfer::new(&SimulationConfig {
            step_percent: 10,
            tick_millis: 100,
        });
        // 10% of 1000 bytes every 100ms
        let speed = sim.bytes_per_sec(1000).unwrap();
        assert!((speed - 1000.0).abs() < 1e-6);
    }
}
