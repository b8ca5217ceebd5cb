// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::chain::ChainError;
use crate::error::{ApiError, Required};
use crate::metrics::METRICS;
use crate::network::Network;

#[derive(Debug, Deserialize)]
pub struct NetworkBody {
    pub network: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkQuery {
    pub network: Option<String>,
}

/// Header carrying the operator secret for switching networks
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn parse_network(raw: &str) -> Result<Network, ApiError> {
    raw.parse().map_err(|e| ApiError::BadRequest(format!("{}", e)))
}

/// The active network as a browser should use it, plus the public database URL. A
/// `network` query returns that profile instead, leaving the active one alone.
pub async fn get_network(
    State(state): State<AppState>,
    Query(query): Query<NetworkQuery>,
) -> Result<Json<Value>, ApiError> {
    let network = match query.network.filter(|n| !n.is_empty()) {
        Some(raw) => parse_network(&raw)?,
        None => state.resolver.network(),
    };
    Ok(Json(json!({
        "network": network,
        "active": state.resolver.network(),
        "profile": state.resolver.profiles().get(network).for_browser(),
        "available": [Network::Testnet, Network::Mainnet],
        "publicDatabaseUrl": state.config.database.public_url,
    })))
}

/// Switch the process-wide network. Affects every client, so only operators holding
/// the admin token may do it.
pub async fn set_network(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NetworkBody>,
) -> Result<Json<Value>, ApiError> {
    let expected = state
        .config
        .server
        .network_admin_token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Forbidden("Network switching is disabled".to_string()))?;
    let presented = headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        warn!("Rejected network switch without a valid admin token");
        return Err(ApiError::Forbidden("Invalid admin token".to_string()));
    }

    let mut required = Required::new();
    let network = required.take("network", body.network);
    required.finish()?;

    let network = parse_network(&network)?;
    state.resolver.set(network);
    info!("Active network switched to {}", network);
    Ok(Json(json!({
        "network": network,
        "profile": state.resolver.browser_profile(),
    })))
}

/// Same-origin proxy to the active node's REST API
pub async fn proxy_rpc(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let base = state.resolver.active_profile().rpc_url;
    let mut target = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    if let Some(query) = query {
        target.push('?');
        target.push_str(&query);
    }
    forward(&state, method, target, &headers, body).await
}

/// Same-origin proxy to the active network's GraphQL indexer
pub async fn proxy_indexer(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let target = state.resolver.active_profile().indexer_url;
    forward(&state, method, target, &headers, body).await
}

async fn forward(state: &AppState, method: Method, target: String, headers: &HeaderMap, body: Bytes) -> Result<Response, ApiError> {
    debug!("Proxying {} {}", method, target);
    METRICS.chain_requests.with_label_values(&["proxy"]).inc();

    let mut request = state.chain.http().request(method, &target).body(body);
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        request = request.header(CONTENT_TYPE, content_type.clone());
    }

    let upstream = request.send().await.map_err(ChainError::from)?;
    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let bytes = upstream.bytes().await.map_err(ChainError::from)?;

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}
