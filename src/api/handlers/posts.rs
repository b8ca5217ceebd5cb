// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::routes::{canonical, PaginationParams};
use crate::api::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub address: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A page of the feed, or of one creator's posts when `address` is given
pub async fn get_posts(State(state): State<AppState>, Query(query): Query<PostsQuery>) -> Result<Json<Value>, ApiError> {
    let page = PaginationParams {
        limit: query.limit,
        offset: query.offset,
    };
    let (offset, limit) = (page.offset(), page.limit());
    debug!("Getting posts, address: {:?}, limit: {}, offset: {}", query.address, limit, offset);

    let posts = match query.address.filter(|a| !a.is_empty()) {
        Some(address) => state.chain.fetch_user_posts(&canonical(&address)?, offset, limit).await,
        None => state.chain.fetch_posts(offset, limit).await,
    };

    Ok(Json(json!({
        "posts": posts,
        "offset": offset,
        "limit": limit,
    })))
}

/// One post with its comments
pub async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid post id {:?}", id)))?;

    let post = state.chain.fetch_post(id).await.ok_or(ApiError::NotFound("Post"))?;
    let comments = state.chain.fetch_comments_of(id).await;
    Ok(Json(json!({
        "post": post,
        "comments": comments,
    })))
}
