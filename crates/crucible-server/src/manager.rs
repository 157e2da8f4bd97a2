//! Session Manager: maps live connections to their sessions

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use crucible_core::GraphStore;
use crucible_engine::SearchEngine;
use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::Frame;
use crate::images::ImageResolver;
use crate::session::{
    SearchSession, Session, SessionChannel, SessionConfig, SessionContext, SessionId, SessionState,
};

/// At most one request waits while the session is busy with another.
pub const REQUEST_QUEUE_DEPTH: usize = 1;

struct SessionHandle {
    closed: CancellationToken,
    status: watch::Receiver<SearchSession>,
}

/// The transport's ends of a freshly opened session.
pub struct ClientEnd {
    pub id: SessionId,
    pub requests: mpsc::Sender<String>,
    pub frames: mpsc::Receiver<Frame>,
}

pub struct SessionManager {
    ctx: Arc<SessionContext>,
    sessions: DashMap<SessionId, SessionHandle>,
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new(
        store: Arc<GraphStore>,
        engine: Arc<dyn SearchEngine>,
        images: ImageResolver,
        config: SessionConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(SessionContext {
                store,
                engine,
                images,
                config,
            }),
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    /// Bind a new session to a channel. The channel is moved in, so a
    /// connection can never be served by two sessions.
    pub fn accept(&self, channel: SessionChannel) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let closed = CancellationToken::new();
        let (session, status) = Session::new(id, Arc::clone(&self.ctx), channel, closed.clone());

        self.sessions.insert(id, SessionHandle { closed, status });
        tokio::spawn(session.run());

        info!(session = %id, engine = self.ctx.engine.name(), "Session opened");
        id
    }

    /// Create the channel pair for a connection and accept it.
    pub fn open(&self) -> ClientEnd {
        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let (frames_tx, frames_rx) = mpsc::channel(self.ctx.config.frame_buffer.max(1));
        let id = self.accept(SessionChannel {
            requests: requests_rx,
            frames: frames_tx,
        });
        ClientEnd {
            id,
            requests: requests_tx,
            frames: frames_rx,
        }
    }

    /// Cancel any running search and release the session. Returns false if
    /// the session was already released.
    pub fn on_close(&self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some((_, handle)) => {
                handle.closed.cancel();
                info!(session = %id, "Session released");
                true
            }
            None => {
                debug!(session = %id, "Session already released");
                false
            }
        }
    }

    pub fn snapshot(&self, id: SessionId) -> Option<SearchSession> {
        self.sessions.get(&id).map(|handle| handle.status.borrow().clone())
    }

    pub fn state(&self, id: SessionId) -> Option<SessionState> {
        self.sessions.get(&id).map(|handle| handle.status.borrow().state)
    }

    /// When the session's current (or last) search began.
    pub fn started_at(&self, id: SessionId) -> Option<DateTime<Utc>> {
        self.sessions.get(&id).and_then(|handle| handle.status.borrow().started_at)
    }

    /// A receiver that observes every state change of the session.
    pub fn watch(&self, id: SessionId) -> Option<watch::Receiver<SearchSession>> {
        self.sessions.get(&id).map(|handle| handle.status.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Close every session, e.g. on server shutdown.
    pub fn close_all(&self) {
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.on_close(id);
        }
    }
}
