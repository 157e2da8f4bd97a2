//! Engine that replays recorded event scripts per target

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::{DEFAULT_EVENT_BUFFER, EngineError, EngineStream, SearchEngine};
use crate::event::{EngineEvent, EngineFailure, SearchJob};
use crate::wire::{Flow, forward};

/// One scripted event, emitted after `delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub delay_ms: u64,
    pub event: EngineEvent,
}

impl ScriptStep {
    pub fn now(event: EngineEvent) -> Self {
        ScriptStep { delay_ms: 0, event }
    }

    pub fn after(delay_ms: u64, event: EngineEvent) -> Self {
        ScriptStep { delay_ms, event }
    }
}

/// Deterministic engine for demos and tests.
///
/// Targets without a script fail with `Unreachable`. A script that ends
/// without a terminal step leaves the stream open until cancelled, which is
/// how a hung engine is simulated.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    scripts: HashMap<String, Vec<ScriptStep>>,
    jobs: Arc<Mutex<Vec<SearchJob>>>,
    cancelled: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, target: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        self.scripts.insert(target.into(), steps);
        self
    }

    /// Load `{ "<target>": [ {"delay_ms": n, "event": {...}}, ... ] }`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine script {}", path.display()))?;
        let scripts: HashMap<String, Vec<ScriptStep>> = serde_json::from_str(&json)
            .with_context(|| format!("parsing engine script {}", path.display()))?;
        Ok(Self {
            scripts,
            ..Self::default()
        })
    }

    /// Jobs received so far, oldest first.
    pub fn jobs(&self) -> Vec<SearchJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    /// Number of jobs that observed cancellation before finishing.
    pub fn cancellations(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SearchEngine for ScriptedEngine {
    async fn start(
        &self,
        job: SearchJob,
        cancel: CancellationToken,
    ) -> Result<EngineStream, EngineError> {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job.clone());
        }

        let steps = self.scripts.get(&job.target).cloned().unwrap_or_else(|| {
            vec![ScriptStep::now(EngineEvent::Failed {
                failure: EngineFailure::Unreachable,
            })]
        });
        let terminates = steps.iter().any(|s| s.event.is_terminal());
        let cancelled = Arc::clone(&self.cancelled);
        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_BUFFER);

        tokio::spawn(async move {
            for step in steps {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Scripted job for {} cancelled", job.target);
                        cancelled.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(step.delay_ms)) => {}
                }
                if forward(&tx, step.event).await == Flow::Stop {
                    return;
                }
            }
            if !terminates {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled.fetch_add(1, Ordering::SeqCst);
                    }
                    _ = tx.closed() => {}
                }
            }
        });
        Ok(rx)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
