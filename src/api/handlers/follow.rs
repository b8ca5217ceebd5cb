// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::routes::{canonical, read_payload, SignaturePolicy};
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::metrics::record_toggle;
use crate::models::notification::NewNotification;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowQuery {
    pub address: Option<String>,
    pub viewer: Option<String>,
    /// `followers` or `following` to include that list
    pub list: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowBody {
    pub user_address: Option<String>,
    pub target_address: Option<String>,
}

/// Follower/following counts for an address, computed from the edge set
pub async fn get_follow(State(state): State<AppState>, Query(query): Query<FollowQuery>) -> Result<Json<Value>, ApiError> {
    let mut required = Required::new();
    let address = required.take("address", query.address);
    required.finish()?;
    let address = canonical(&address)?;
    let viewer = query.viewer.filter(|v| !v.is_empty()).map(|v| canonical(&v)).transpose()?;
    let store = state.store()?;

    let stats = store.follow_stats(&address, viewer.as_deref()).await?;
    let mut response = json!({
        "address": address,
        "followersCount": stats.followers_count,
        "followingCount": stats.following_count,
        "isFollowing": stats.is_following,
    });

    match query.list.as_deref() {
        Some("followers") => response["followers"] = json!(store.followers_of(&address).await?),
        Some("following") => response["following"] = json!(store.following_of(&address).await?),
        Some(other) => return Err(ApiError::BadRequest(format!("Unknown list {:?}", other))),
        None => {}
    }

    Ok(Json(response))
}

/// Toggle a follow edge. Only the signer may follow on their own behalf.
pub async fn toggle_follow(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: FollowBody = read_payload(&state, body, SignaturePolicy::Required, |b: &FollowBody| {
        b.user_address.as_deref()
    })?;

    let mut required = Required::new();
    let user = required.take("userAddress", body.user_address);
    let target = required.take("targetAddress", body.target_address);
    required.finish()?;
    let user = canonical(&user)?;
    let target = canonical(&target)?;
    if user == target {
        return Err(ApiError::BadRequest("Cannot follow yourself".to_string()));
    }

    let following = store.toggle_follow(&user, &target).await?;
    record_toggle("follow", following);
    debug!("{} {} {}", user, if following { "followed" } else { "unfollowed" }, target);

    if following {
        let notification = NewNotification::new(&target, "follow", format!("{} started following you", user))
            .related_to(&user);
        if let Err(e) = store.add_notification(notification).await {
            warn!("Failed to notify {} of new follower: {}", target, e);
        }
    }

    let stats = store.follow_stats(&target, Some(&user)).await?;
    Ok(Json(json!({
        "following": following,
        "followersCount": stats.followers_count,
    })))
}
