//! HTTP server: playlist download, authenticated video files, health check

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::auth;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::playlist::{self, AuthenticatedUrl};
use crate::scanner::CancelToken;

/// Content type of the playlist response
pub const PLAYLIST_CONTENT_TYPE: &str = "application/x-mpegurl";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

/// Create the router with all routes
pub fn create_router(config: ServerConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    let playlist_routes = Router::new()
        .route("/playlist", get(playlist_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(playlist_routes)
        .merge(video_routes(&state))
        .layer(middleware::from_fn(request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn video_routes(state: &AppState) -> Router<AppState> {
    let routes = match &state.config.videos_path {
        Some(dir) => Router::new().nest_service("/videos", ServeDir::new(dir)),
        None => Router::new()
            .route("/videos", any(videos_not_configured))
            .route("/videos/*path", any(videos_not_configured)),
    };
    routes.layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_basic_auth,
    ))
}

async fn videos_not_configured() -> ServerError {
    ServerError::Config("Videos path not configured")
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Cancels the scan if the request future is dropped before it finishes
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn playlist_handler(State(state): State<AppState>) -> Result<Response, ServerError> {
    let config = &state.config;

    let videos_path = config
        .videos_path
        .clone()
        .ok_or(ServerError::Config("Videos path not configured"))?;
    let base_url = config
        .base_url
        .as_deref()
        .ok_or(ServerError::Config("Base URL not configured"))?;
    let (username, password) = match (&config.auth_username, &config.auth_password) {
        (Some(user), Some(pass)) => (user.as_str(), pass.as_str()),
        _ => return Err(ServerError::Config("HTTP auth credentials not configured")),
    };

    let cancel = CancelToken::new();
    let _guard = CancelOnDrop(cancel.clone());
    let scan_config = config.scan.clone();
    let entries = tokio::task::spawn_blocking(move || {
        crate::collect_videos(&videos_path, &scan_config, &cancel)
    })
    .await??;

    let resolver = AuthenticatedUrl::new(base_url, username, password);
    let body = playlist::build(&entries, &resolver);
    log::info!("Serving playlist with {} entries", entries.len());

    Ok((
        [
            (header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"playlist.m3u\"",
            ),
        ],
        body,
    )
        .into_response())
}

/// Request logging middleware
async fn request_logger(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        log::info!("{} {} {} in {:?}", method, path, status, duration);
    } else {
        log::warn!("{} {} {} in {:?}", method, path, status, duration);
    }

    response
}

/// Bind the listener and serve until Ctrl+C
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_router(config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server running on port {}", addr.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
