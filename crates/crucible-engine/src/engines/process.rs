//! Engine reached as a child process speaking JSON lines over stdio

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::{DEFAULT_EVENT_BUFFER, EngineError, EngineStream, SearchEngine};
use crate::event::{EngineEvent, SearchJob};
use crate::wire::{LinesEnd, pump_lines};

/// How long a process may linger after its terminal event before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Spawns one engine process per job.
///
/// The job is written to stdin as a single JSON line and stdin is closed; the
/// process answers with one JSON event per line on stdout.
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
    buffer: usize,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

#[async_trait::async_trait]
impl SearchEngine for ProcessEngine {
    async fn start(
        &self,
        job: SearchJob,
        cancel: CancellationToken,
    ) -> Result<EngineStream, EngineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdout unavailable".to_string()))?;

        let mut line = serde_json::to_vec(&job)?;
        line.push(b'\n');
        // A process that never drains stdin must not pin the session here.
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Job for {} cancelled before the engine read it", job.target);
                let _ = child.kill().await;
                return Err(EngineError::Cancelled);
            }
            written = stdin.write_all(&line) => {
                written.map_err(|e| EngineError::Transport(e.to_string()))?;
            }
        }
        drop(stdin);

        debug!("Started engine process {} for {}", self.program, job.target);

        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(pump(child, stdout, tx, cancel));
        Ok(rx)
    }

    fn name(&self) -> &str {
        "process"
    }
}

async fn pump(
    mut child: Child,
    stdout: ChildStdout,
    tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
) {
    match pump_lines(BufReader::new(stdout), &tx, &cancel).await {
        LinesEnd::Delivered => {}
        LinesEnd::Cancelled => {
            debug!("Cancelling engine process");
            if let Err(e) = child.kill().await {
                warn!("Failed to kill engine process: {}", e);
            }
            return;
        }
        LinesEnd::Eof => {
            let message = match child.wait().await {
                Ok(status) => format!("engine exited ({}) without a result", status),
                Err(e) => format!("engine exited without a result: {}", e),
            };
            let _ = tx.send(EngineEvent::internal(message)).await;
            return;
        }
        LinesEnd::Failed(e) => {
            let _ = tx.send(EngineEvent::internal(format!("engine stdout: {}", e))).await;
        }
    }

    if tokio::time::timeout(EXIT_GRACE, child.wait()).await.is_err() {
        warn!("Engine process did not exit after its result; killing it");
        let _ = child.kill().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessEngine {
        ProcessEngine::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    fn job() -> SearchJob {
        SearchJob::new("Steam", crate::SearchMode::Bfs, crate::ResultPolicy::Best)
    }

    #[tokio::test]
    async fn test_streams_events_in_order() {
        let engine = sh(concat!(
            "read job; ",
            r#"echo '{"event":"progress","tree":{"name":"Steam","image_path":""}}'; "#,
            r#"echo '{"event":"done","trees":[{"name":"Steam","image_path":""}]}'"#,
        ));
        let mut rx = engine.start(job(), CancellationToken::new()).await.unwrap();

        assert!(matches!(rx.recv().await, Some(EngineEvent::Progress { .. })));
        match rx.recv().await {
            Some(EngineEvent::Done { trees }) => assert_eq!(trees[0].name, "Steam"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_job_is_written_to_stdin() {
        // Echo the job's target back as the tree name.
        let engine = sh(concat!(
            "read job; ",
            r#"case "$job" in *'"target":"Steam"'*) name=Steam;; *) name=wrong;; esac; "#,
            r#"echo "{\"event\":\"done\",\"trees\":[{\"name\":\"$name\",\"image_path\":\"\"}]}""#,
        ));
        let mut rx = engine.start(job(), CancellationToken::new()).await.unwrap();
        match rx.recv().await {
            Some(EngineEvent::Done { trees }) => assert_eq!(trees[0].name, "Steam"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exit_without_result_is_internal_failure() {
        let engine = sh("read job; exit 3");
        let mut rx = engine.start(job(), CancellationToken::new()).await.unwrap();
        match rx.recv().await {
            Some(EngineEvent::Failed { failure }) => {
                assert!(failure.to_string().contains("without a result"))
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_kills_process() {
        let engine = sh("read job; sleep 30");
        let cancel = CancellationToken::new();
        let mut rx = engine.start(job(), cancel.clone()).await.unwrap();
        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_cancel_while_job_is_unread() {
        // Larger than a pipe buffer, so the write blocks until the child reads.
        let mut job = job();
        job.target = "Steam".repeat(100_000);
        let engine = sh("sleep 30");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = tokio::time::timeout(Duration::from_secs(5), engine.start(job, cancel))
            .await
            .expect("start ignored cancellation");
        assert!(matches!(started, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let engine = ProcessEngine::new("/definitely/not/an/engine", vec![]);
        let err = engine.start(job(), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn(_)));
    }
}
