//! HTTP + WebSocket server: search-visualization sessions and the encyclopedia API

pub mod error;
pub mod codec;
pub mod images;
pub mod session;
pub mod manager;
pub mod handlers;
pub mod router;
pub mod websocket;


#[cfg(test)]
pub mod test_utils;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crucible_core::{DEFAULT_PAGE_SIZE, GraphStore};
use crucible_engine::SearchEngine;
use tokio::net::TcpListener;
use tracing::info;

pub use codec::{Frame, RawSearchRequest, SearchRequest, decode_request};
pub use error::SessionError;
pub use images::{DEFAULT_IMAGE_BASE_URL, ImageResolver};
pub use manager::{ClientEnd, SessionManager};
pub use router::create_router;
pub use session::{SearchSession, SessionConfig, SessionId, SessionState};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for any path the API does not claim.
    pub static_dir: Option<PathBuf>,
    pub page_size: usize,
    pub image_base_url: String,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            static_dir: None,
            page_size: DEFAULT_PAGE_SIZE,
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            session: SessionConfig::default(),
        }
    }
}

/// State shared by every handler.
pub struct ServerState {
    pub store: Arc<GraphStore>,
    pub sessions: SessionManager,
    pub images: ImageResolver,
    pub page_size: usize,
}

impl ServerState {
    pub fn new(store: GraphStore, engine: Arc<dyn SearchEngine>, config: &ServerConfig) -> Self {
        let store = Arc::new(store);
        let images = ImageResolver::new(config.image_base_url.clone());
        Self {
            sessions: SessionManager::new(
                Arc::clone(&store),
                engine,
                images.clone(),
                config.session.clone(),
            ),
            store,
            images,
            page_size: config.page_size.max(1),
        }
    }
}

pub struct CrucibleServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl CrucibleServer {
    pub fn new(store: GraphStore, engine: Arc<dyn SearchEngine>, config: ServerConfig) -> Self {
        let state = Arc::new(ServerState::new(store, engine, &config));
        Self { state, config }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr: SocketAddr = listener.local_addr()?;
        let router = create_router(self.state(), self.config.static_dir.as_deref());
        info!(
            "Crucible server listening on http://{} ({} elements, {} recipes)",
            addr,
            self.state.store.element_count(),
            self.state.store.recipe_count()
        );

        let state = self.state();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down");
                state.sessions.close_all();
            })
            .await
            .context("server error")?;
        Ok(())
    }
}
