//! The per-connection Search-Visualization Session
//!
//! A session is a single task that owns its request queue and frame sink.
//! Every state transition happens on that task, so a close arriving while a
//! frame is being produced can never interleave with it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crucible_core::{GraphStore, RecipeTreeNode, VisitedSet};
use crucible_engine::{EngineEvent, EngineStream, SearchEngine, SearchJob};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{self, Frame, SearchRequest};
use crate::error::SessionError;
use crate::images::ImageResolver;

/// Stand-in deadline for searches without a timeout.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingRequest,
    Running,
    Completed,
    Failed,
}

/// Observable record of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSession {
    pub id: SessionId,
    pub state: SessionState,
    /// The request being served, while `Running` and until the next one.
    pub request: Option<SearchRequest>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Searches still running after this long fail with `Timeout`.
    pub search_timeout: Option<Duration>,
    /// Attach `duration_ms` and `nodes_explored` to exploring frames.
    pub report_stats: bool,
    /// Drop an exploring frame identical to the previous one when unpaced.
    pub coalesce_duplicates: bool,
    /// Outbound frames buffered per connection before the session waits.
    pub frame_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_timeout: None,
            report_stats: true,
            coalesce_duplicates: true,
            frame_buffer: 64,
        }
    }
}

/// Collaborators shared read-only by every session.
pub struct SessionContext {
    pub store: Arc<GraphStore>,
    pub engine: Arc<dyn SearchEngine>,
    pub images: ImageResolver,
    pub config: SessionConfig,
}

/// The session's ends of a client connection.
pub struct SessionChannel {
    pub requests: mpsc::Receiver<String>,
    pub frames: mpsc::Sender<Frame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Closed,
}

enum Outcome {
    Trees(Vec<RecipeTreeNode>),
    Failed(SessionError),
    Closed,
}

pub struct Session {
    id: SessionId,
    ctx: Arc<SessionContext>,
    requests: mpsc::Receiver<String>,
    frames: mpsc::Sender<Frame>,
    closed: CancellationToken,
    status: watch::Sender<SearchSession>,
}

impl Session {
    pub fn new(
        id: SessionId,
        ctx: Arc<SessionContext>,
        channel: SessionChannel,
        closed: CancellationToken,
    ) -> (Self, watch::Receiver<SearchSession>) {
        let (status, status_rx) = watch::channel(SearchSession {
            id,
            state: SessionState::Idle,
            request: None,
            started_at: None,
        });
        let session = Session {
            id,
            ctx,
            requests: channel.requests,
            frames: channel.frames,
            closed,
            status,
        };
        (session, status_rx)
    }

    /// Serve requests until the connection closes.
    ///
    /// `Idle` is held only while a finished request is being wrapped up and
    /// once the connection is gone; between requests the session sits in
    /// `AwaitingRequest`.
    pub async fn run(mut self) {
        loop {
            self.transition(SessionState::AwaitingRequest);
            let text = tokio::select! {
                biased;
                _ = self.closed.cancelled() => break,
                text = self.requests.recv() => match text {
                    Some(text) => text,
                    None => break,
                },
            };
            if self.handle(&text).await == Flow::Closed {
                break;
            }
        }

        self.status.send_modify(|s| {
            s.state = SessionState::Idle;
            s.started_at = None;
        });
        debug!(session = %self.id, "Session task finished");
    }

    async fn handle(&mut self, text: &str) -> Flow {
        let request = match codec::decode_request(text).and_then(|raw| raw.validate(&self.ctx.store)) {
            Ok(request) => request,
            Err(error) => {
                warn!(session = %self.id, code = error.code(), "Rejected search request");
                let flow = self.emit(Frame::error(error)).await;
                self.transition(SessionState::Idle);
                return flow;
            }
        };

        info!(
            session = %self.id,
            target = %request.target,
            mode = %request.mode,
            delay_ms = request.delay.as_millis() as u64,
            "Search started"
        );
        self.status.send_modify(|s| {
            s.state = SessionState::Running;
            s.request = Some(request.clone());
            s.started_at = Some(Utc::now());
        });

        let outcome = match self.basic_leaf(&request.target) {
            Some(leaf) => Outcome::Trees(vec![leaf]),
            None => self.search(&request).await,
        };

        let (state, frame) = match outcome {
            Outcome::Trees(trees) => {
                info!(session = %self.id, trees = trees.len(), "Search completed");
                (SessionState::Completed, Frame::Result(trees))
            }
            Outcome::Failed(error) => {
                info!(session = %self.id, code = error.code(), "Search failed");
                (SessionState::Failed, Frame::error(error))
            }
            Outcome::Closed => {
                info!(session = %self.id, "Connection closed during search");
                return Flow::Closed;
            }
        };
        self.transition(state);
        let flow = self.emit(frame).await;
        self.transition(SessionState::Idle);
        flow
    }

    /// Basic targets need no recipe, so they are answered without the engine.
    fn basic_leaf(&self, target: &str) -> Option<RecipeTreeNode> {
        let element = self.ctx.store.get(target)?;
        let visited = VisitedSet::new();
        if !self.ctx.store.classify(element, &visited).is_basic {
            return None;
        }
        Some(RecipeTreeNode::leaf(
            element.name.clone(),
            self.ctx.images.resolve(&element.image_path),
        ))
    }

    async fn search(&mut self, request: &SearchRequest) -> Outcome {
        let config = &self.ctx.config;
        let report_stats = config.report_stats;
        let coalesce = config.coalesce_duplicates && request.delay.is_zero();
        let started = Instant::now();
        let deadline = config.search_timeout.map(|timeout| started + timeout);

        let cancel = self.closed.child_token();
        let job = SearchJob::new(request.target.clone(), request.mode, request.policy);
        let engine = Arc::clone(&self.ctx.engine);
        // Polled inside the loop so close, timeout and busy requests are
        // handled while the engine is still starting.
        let start = engine.start(job, cancel.clone());
        tokio::pin!(start);
        let mut events: Option<EngineStream> = None;

        let timeout = sleep_until(deadline.unwrap_or(started + FAR_FUTURE));
        tokio::pin!(timeout);

        // Exploring frames are paced from the start of the search, then
        // from the previous frame.
        let mut last_frame_at = started;
        let mut pending: Option<(RecipeTreeNode, u64)> = None;
        let mut last_tree: Option<RecipeTreeNode> = None;
        let mut explored: u64 = 0;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => break Outcome::Closed,
                text = self.requests.recv() => match text {
                    Some(_) => {
                        debug!(session = %self.id, "Request received while running");
                        if self.emit(Frame::error(SessionError::SessionBusy)).await == Flow::Closed {
                            break Outcome::Closed;
                        }
                    }
                    None => break Outcome::Closed,
                },
                _ = &mut timeout, if deadline.is_some() => {
                    warn!(session = %self.id, "Search timed out");
                    break Outcome::Failed(SessionError::Timeout);
                }
                accepted = &mut start, if events.is_none() => match accepted {
                    Ok(stream) => {
                        debug!(session = %self.id, engine = engine.name(), "Engine accepted job");
                        events = Some(stream);
                    }
                    Err(e) => {
                        error!(session = %self.id, engine = engine.name(), "Engine failed to start: {}", e);
                        break Outcome::Failed(SessionError::EngineInternalError);
                    }
                },
                _ = sleep_until(last_frame_at + request.delay), if pending.is_some() => {
                    if let Some((tree, nodes)) = pending.take() {
                        let frame = if report_stats {
                            Frame::exploring_with_stats(tree, started.elapsed(), nodes)
                        } else {
                            Frame::exploring(tree)
                        };
                        if self.emit(frame).await == Flow::Closed {
                            break Outcome::Closed;
                        }
                        last_frame_at = Instant::now();
                    }
                }
                event = next_event(&mut events), if events.is_some() && pending.is_none() => match event {
                    Some(EngineEvent::Progress { mut tree, nodes_explored }) => {
                        explored = nodes_explored.unwrap_or(explored + 1);
                        self.ctx.images.resolve_tree(&mut tree);
                        if coalesce && last_tree.as_ref() == Some(&tree) {
                            continue;
                        }
                        last_tree = Some(tree.clone());
                        pending = Some((tree, explored));
                    }
                    Some(EngineEvent::Done { mut trees }) => {
                        trees.truncate(request.policy.limit());
                        if trees.is_empty() {
                            break Outcome::Failed(SessionError::TargetUnreachable);
                        }
                        for tree in &mut trees {
                            self.ctx.images.resolve_tree(tree);
                        }
                        break Outcome::Trees(trees);
                    }
                    Some(EngineEvent::Failed { failure }) => {
                        debug!(session = %self.id, "Engine reported: {}", failure);
                        break Outcome::Failed(failure.into());
                    }
                    None => {
                        warn!(session = %self.id, "Engine stream ended without a result");
                        break Outcome::Failed(SessionError::EngineInternalError);
                    }
                },
            }
        };

        if matches!(outcome, Outcome::Closed | Outcome::Failed(SessionError::Timeout)) {
            debug!(session = %self.id, "Cancelling engine job");
            cancel.cancel();
        }
        outcome
    }

    /// Send one frame unless the connection is gone.
    async fn emit(&self, frame: Frame) -> Flow {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Flow::Closed,
            sent = self.frames.send(frame) => match sent {
                Ok(()) => Flow::Continue,
                Err(_) => Flow::Closed,
            },
        }
    }

    fn transition(&self, state: SessionState) {
        self.status.send_modify(|s| s.state = state);
    }
}

/// Next event once the engine has accepted the job.
async fn next_event(events: &mut Option<EngineStream>) -> Option<EngineEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}
