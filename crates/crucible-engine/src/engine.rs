//! The search engine trait consumed by sessions

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::{EngineEvent, SearchJob};

/// Ordered event stream for one job. Closing without a terminal event means
/// the engine went away.
pub type EngineStream = mpsc::Receiver<EngineEvent>;

/// Default capacity of the per-job event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start engine process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("engine transport error: {0}")]
    Transport(String),

    #[error("engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to encode search job: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid engine specification: {0}")]
    Spec(String),

    #[error("search job cancelled before the engine accepted it")]
    Cancelled,
}

/// External traversal collaborator.
///
/// `start` hands back a stream of events for the job. Cancelling `cancel`
/// asks the engine to stop; it must not emit further events for the job once
/// it has noticed, though noticing may take a while.
#[async_trait::async_trait]
pub trait SearchEngine: Send + Sync {
    async fn start(
        &self,
        job: SearchJob,
        cancel: CancellationToken,
    ) -> Result<EngineStream, EngineError>;

    /// Get engine name
    fn name(&self) -> &str;
}
