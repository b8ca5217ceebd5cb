// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::routes::{client_ip, string_or_number, user_agent};
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::models::view::{viewer_hash, ViewOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewsQuery {
    pub post_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBody {
    #[serde(default, deserialize_with = "string_or_number")]
    pub post_id: Option<String>,
    pub wallet_address: Option<String>,
}

pub async fn get_views(State(state): State<AppState>, Query(query): Query<ViewsQuery>) -> Result<Json<Value>, ApiError> {
    let mut required = Required::new();
    let post_id = required.take("postId", query.post_id);
    required.finish()?;

    let views = state.store()?.view_count(&post_id).await?;
    Ok(Json(json!({ "postId": post_id, "views": views })))
}

/// Count a view once per viewer. Guests are identified by a salted hash of their
/// IP and user agent, so this endpoint never requires a signature.
pub async fn record_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ViewBody>,
) -> Result<Json<ViewOutcome>, ApiError> {
    let store = state.store()?;
    let mut required = Required::new();
    let post_id = required.take("postId", body.post_id);
    required.finish()?;

    let viewer = viewer_hash(
        body.wallet_address.as_deref(),
        &client_ip(&headers),
        &user_agent(&headers),
        &state.config.server.viewer_hash_salt,
    );
    let outcome = store.record_view(&post_id, &viewer).await?;
    Ok(Json(outcome))
}
