// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

mod handlers;
mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chain::ChainClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::network::NetworkResolver;
use crate::store::SocialStore;

pub use handlers::network::ADMIN_TOKEN_HEADER;

/// Everything a handler can reach
#[derive(Clone)]
pub struct AppState {
    /// Absent when the database is not configured; handlers that need it answer 500
    pub store: Option<Arc<dyn SocialStore>>,
    pub chain: Arc<ChainClient>,
    pub resolver: Arc<NetworkResolver>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn store(&self) -> Result<&Arc<dyn SocialStore>, ApiError> {
        self.store.as_ref().ok_or_else(|| {
            let mut missing = self.config.database.missing_settings();
            if missing.is_empty() {
                missing.push("DATABASE_URL");
            }
            ApiError::BackendUnavailable(missing)
        })
    }
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // Base64 JSON bodies are 4/3 the size of the file they carry
    let max_file = state.config.server.upload_max_bytes;
    let upload_limit = max_file.saturating_add(max_file / 3).saturating_add(64 * 1024);

    let cors = if state.config.server.enable_cors {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        // General routes
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::get_metrics))
        // Chain reads
        .route("/api/posts", get(handlers::posts::get_posts))
        .route("/api/posts/:id", get(handlers::posts::get_post))
        .route("/api/profile", get(handlers::profile::get_profile).post(handlers::profile::update_profile))
        // Social state
        .route("/api/bookmarks", get(handlers::bookmarks::get_bookmarks).post(handlers::bookmarks::toggle_bookmark))
        .route("/api/follow", get(handlers::follow::get_follow).post(handlers::follow::toggle_follow))
        .route(
            "/api/interactions",
            get(handlers::interactions::get_interactions).post(handlers::interactions::toggle_interaction),
        )
        .route(
            "/api/messages",
            get(handlers::messages::get_messages)
                .post(handlers::messages::send_message)
                .put(handlers::messages::mark_read),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::get_notifications).post(handlers::notifications::update_notifications),
        )
        .route("/api/tips", get(handlers::tips::get_tips).post(handlers::tips::record_tip))
        .route("/api/views", get(handlers::views::get_views).post(handlers::views::record_view))
        .route("/api/votes", get(handlers::votes::get_votes).post(handlers::votes::toggle_vote))
        .route(
            "/api/upload",
            post(handlers::upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Network selection and same-origin proxies
        .route("/api/network", get(handlers::network::get_network).post(handlers::network::set_network))
        .route("/api/rpc/*path", any(handlers::network::proxy_rpc))
        .route("/api/indexer", any(handlers::network::proxy_indexer))
        .nest_service("/uploads", ServeDir::new(&state.config.server.upload_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the API until `shutdown` resolves
pub async fn start_api_server(state: AppState, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port).parse::<SocketAddr>()?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting API server on {}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    Ok(())
}
