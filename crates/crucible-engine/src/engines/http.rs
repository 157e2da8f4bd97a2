//! Engine reached over HTTP with an NDJSON response stream

use std::io;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::{DEFAULT_EVENT_BUFFER, EngineError, EngineStream, SearchEngine};
use crate::event::{EngineEvent, SearchJob};
use crate::wire::{LinesEnd, pump_lines};

/// POSTs each job to `{base_url}/search` and streams the response body.
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
    buffer: usize,
}

impl HttpEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

#[async_trait::async_trait]
impl SearchEngine for HttpEngine {
    async fn start(
        &self,
        job: SearchJob,
        cancel: CancellationToken,
    ) -> Result<EngineStream, EngineError> {
        let send = self
            .client
            .post(self.search_url())
            .header("Accept", "application/x-ndjson")
            .json(&job)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Job for {} cancelled before the engine answered", job.target);
                return Err(EngineError::Cancelled);
            }
            response = send => response?.error_for_status()?,
        };

        debug!("Engine accepted job for {}", job.target);

        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(async move {
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(io::Error::other));
            let reader = StreamReader::new(Box::pin(body));

            // Returning drops the body, which closes the connection.
            match pump_lines(reader, &tx, &cancel).await {
                LinesEnd::Delivered => {}
                LinesEnd::Cancelled => debug!("Dropping engine stream after cancellation"),
                LinesEnd::Eof => {
                    let _ = tx.send(EngineEvent::internal("engine closed the stream without a result")).await;
                }
                LinesEnd::Failed(e) => {
                    let _ = tx.send(EngineEvent::internal(format!("engine stream: {}", e))).await;
                }
            }
        });
        Ok(rx)
    }

    fn name(&self) -> &str {
        "http"
    }
}
