//! Transfer clients: the narrow contract the orchestrator uploads through.
//!
//! The orchestrator does not care how bytes move. It hands a
//! [`TransferRequest`] and a progress callback to a [`TransferClient`] and
//! waits for a result reference (typically the stored file's URL).

mod error;
mod http;
mod simulated;

use async_trait::async_trait;
use std::sync::Arc;

use crate::candidate::Source;
use crate::task::TaskId;

pub use error::TransferError;
pub use http::HttpTransfer;
pub use simulated::SimulatedTransfer;

/// Everything a transport needs to send one file.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub task_id: TaskId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source: Source,
}

/// One progress report from a transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// 0..=100.
    pub percent: u8,
    pub bytes_per_sec: Option<f64>,
}

/// Progress sink handed to the transport. May be called from any thread;
/// calls after the transfer settled are ignored by the orchestrator.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Uploads the payload and returns a reference to the stored result.
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressCallback,
    ) -> Result<String, TransferError>;
}

