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
use crate::models::interaction::{InteractionKind, InteractionLists};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionsQuery {
    pub user_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionBody {
    pub action: Option<String>,
    pub user_address: Option<String>,
    pub target_address: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub post_id: Option<String>,
}

pub async fn get_interactions(
    State(state): State<AppState>,
    Query(query): Query<InteractionsQuery>,
) -> Result<Json<InteractionLists>, ApiError> {
    let mut required = Required::new();
    let user = required.take("userAddress", query.user_address);
    required.finish()?;

    let lists = state.store()?.interactions_of(&canonical(&user)?).await?;
    Ok(Json(lists))
}

/// Toggle a mute, block or not-interested entry
pub async fn toggle_interaction(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: InteractionBody = read_payload(&state, body, SignaturePolicy::Optional, |b: &InteractionBody| {
        b.user_address.as_deref()
    })?;

    let mut required = Required::new();
    let action = required.take("action", body.action);
    let user = required.take("userAddress", body.user_address);
    let kind = action.parse::<InteractionKind>().ok();
    let target = match kind {
        Some(kind) if kind.targets_user() => required.take("targetAddress", body.target_address),
        Some(_) => required.take("postId", body.post_id),
        None => String::new(),
    };
    required.finish()?;

    let kind = kind.ok_or_else(|| ApiError::BadRequest(format!("Unknown action {:?}", action)))?;
    let user = canonical(&user)?;
    let target = if kind.targets_user() { canonical(&target)? } else { target };
    if kind.targets_user() && user == target {
        return Err(ApiError::BadRequest(format!("Cannot {} yourself", kind.as_str())));
    }

    let active = store.toggle_interaction(kind, &user, &target).await?;
    record_toggle(kind.as_str(), active);
    Ok(Json(json!({ "action": kind, "active": active })))
}
