//! HTTP gateway.
//!
//! Stateless JSON endpoints over the SoundCloud and YouTube pipelines. The
//! only shared state is what [`AppState`] carries, and the only mutable part
//! of that is the credential cache inside [`SoundCloud`].

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::soundcloud::SoundCloud;
use crate::youtube::YouTube;

/// Every route, as listed in the 404 reply.
pub const ENDPOINTS: &[&str] = &[
    "/search?q=<query>&limit=<1-50>",
    "/resolve?url=<soundcloud url>",
    "/stream?url=<soundcloud url>",
    "/youtube/info?url=<youtube url>",
    "/youtube/video?url=<youtube url>&quality=<highest|720p>",
    "/youtube/audio?url=<youtube url>",
    "/health",
];

#[derive(Clone)]
pub struct AppState {
    pub soundcloud: Arc<SoundCloud>,
    pub youtube: Arc<YouTube>,
    /// Budget for one whole request, upstream calls included.
    pub request_timeout: Duration,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", get(routes::search))
        .route("/resolve", get(routes::resolve))
        .route("/stream", get(routes::stream))
        .route("/health", get(routes::health))
        .route("/youtube/info", get(routes::youtube_info))
        .route("/youtube/video", get(routes::youtube_video))
        .route("/youtube/audio", get(routes::youtube_audio))
        .fallback(routes::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gateway listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
