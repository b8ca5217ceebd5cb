// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::api::routes::{canonical, read_payload, string_or_number, SignaturePolicy};
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::metrics::record_toggle;
use crate::models::vote::{VoteSummary, VoteType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotesQuery {
    pub post_id: Option<String>,
    pub user_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    #[serde(default, deserialize_with = "string_or_number")]
    pub post_id: Option<String>,
    pub creator_address: Option<String>,
    pub user_address: Option<String>,
    pub vote_type: Option<String>,
}

/// Tally for a post, with the caller's vote when `userAddress` is given
pub async fn get_votes(
    State(state): State<AppState>,
    Query(query): Query<VotesQuery>,
) -> Result<Json<VoteSummary>, ApiError> {
    let mut required = Required::new();
    let post_id = required.take("postId", query.post_id);
    required.finish()?;

    let user = query
        .user_address
        .filter(|a| !a.is_empty())
        .map(|a| canonical(&a))
        .transpose()?;
    let summary = state.store()?.vote_summary(&post_id, user.as_deref()).await?;
    Ok(Json(summary))
}

/// Toggle a vote and return the post's tally afterwards
pub async fn toggle_vote(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<VoteSummary>, ApiError> {
    let store = state.store()?;
    let body: VoteBody = read_payload(&state, body, SignaturePolicy::Optional, |b: &VoteBody| {
        b.user_address.as_deref()
    })?;

    let mut required = Required::new();
    let post_id = required.take("postId", body.post_id);
    let creator = required.take("creatorAddress", body.creator_address);
    let user = required.take("userAddress", body.user_address);
    let vote_type = required.take("voteType", body.vote_type);
    required.finish()?;

    let vote: VoteType = vote_type.parse().map_err(ApiError::BadRequest)?;
    let creator = canonical(&creator)?;
    let user = canonical(&user)?;

    let current = store.toggle_vote(&post_id, &creator, &user, vote).await?;
    record_toggle("vote", current.is_some());
    debug!("Vote by {} on post {} is now {:?}", user, post_id, current);

    let summary = store.vote_summary(&post_id, Some(&user)).await?;
    Ok(Json(summary))
}
