use axum::response::Html;
use axum::routing::get;
use axum::Router;
use cam_grid_common::config::ServerConfig;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ingest;
use crate::store::FrameStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FrameStore>,
    pub frames_total: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(store: Arc<FrameStore>) -> Self {
        Self {
            store,
            frames_total: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

pub fn router(store: Arc<FrameStore>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ingest::ws_handler))
        .with_state(AppState::new(store))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the producer page and the ingest endpoint until `cancel` fires.
/// In-flight sockets are not chased down; they end when their peers do.
pub async fn serve(
    config: &ServerConfig,
    store: Arc<FrameStore>,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let app = router(store);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Bind(addr.clone(), e))?;

    info!(addr, "listening for producers");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(ServerError::Serve)
}

/// GET / — the page that turns a browser into a frame producer.
async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}
