// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::routes::{canonical, read_payload, string_or_number, SignaturePolicy};
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::metrics::record_toggle;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarksQuery {
    pub user_address: Option<String>,
    pub post_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkBody {
    pub user_address: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub post_id: Option<String>,
    pub creator_address: Option<String>,
}

/// A user's bookmarks, or whether one post is bookmarked when `postId` is given
pub async fn get_bookmarks(
    State(state): State<AppState>,
    Query(query): Query<BookmarksQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut required = Required::new();
    let user = required.take("userAddress", query.user_address);
    required.finish()?;
    let user = canonical(&user)?;
    let store = state.store()?;

    match query.post_id.filter(|id| !id.is_empty()) {
        Some(post_id) => {
            let bookmarked = store.is_bookmarked(&user, &post_id).await?;
            Ok(Json(json!({ "bookmarked": bookmarked })))
        }
        None => {
            let bookmarks = store.bookmarks_of(&user).await?;
            Ok(Json(json!({ "bookmarks": bookmarks })))
        }
    }
}

pub async fn toggle_bookmark(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: BookmarkBody = read_payload(&state, body, SignaturePolicy::Optional, |b: &BookmarkBody| {
        b.user_address.as_deref()
    })?;

    let mut required = Required::new();
    let user = required.take("userAddress", body.user_address);
    let post_id = required.take("postId", body.post_id);
    let creator = required.take("creatorAddress", body.creator_address);
    required.finish()?;

    let bookmarked = store
        .toggle_bookmark(&canonical(&user)?, &post_id, &canonical(&creator)?)
        .await?;
    record_toggle("bookmark", bookmarked);
    Ok(Json(json!({ "bookmarked": bookmarked })))
}
