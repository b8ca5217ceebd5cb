// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::routes::{canonical, read_payload, SignaturePolicy};
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::models::profile::{MergedProfile, ProfileExtension};

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    pub user_address: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub banner_url: Option<String>,
    pub joined_date_visibility: Option<bool>,
}

/// On-chain profile merged with the off-chain extension. Either half may be missing;
/// the answer is then the empty/default value for that half.
pub async fn get_profile(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<MergedProfile>, ApiError> {
    let mut required = Required::new();
    let address = required.take("address", query.address);
    required.finish()?;
    let address = canonical(&address)?;

    let chain_profile = state.chain.fetch_profile(&address).await;
    let extension = match state.store.as_ref() {
        Some(store) => store.profile_extension(&address).await.unwrap_or_else(|e| {
            warn!("Failed to load profile extension for {}: {}", address, e);
            None
        }),
        None => None,
    };

    Ok(Json(MergedProfile::merge(chain_profile, extension)))
}

/// Update the off-chain extension. Fields left out keep their stored value.
pub async fn update_profile(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: ProfileBody = read_payload(&state, body, SignaturePolicy::Required, |b: &ProfileBody| {
        b.user_address.as_deref()
    })?;

    let mut required = Required::new();
    let user = required.take("userAddress", body.user_address);
    required.finish()?;
    let user = canonical(&user)?;

    let current = store
        .profile_extension(&user)
        .await?
        .unwrap_or_else(|| ProfileExtension::empty(&user));
    let updated = ProfileExtension {
        address: user,
        website: body.website.unwrap_or(current.website),
        location: body.location.unwrap_or(current.location),
        banner_url: body.banner_url.unwrap_or(current.banner_url),
        joined_date_visibility: body.joined_date_visibility.unwrap_or(current.joined_date_visibility),
        updated_at: Utc::now(),
    };

    let saved = store.upsert_profile_extension(updated).await?;
    Ok(Json(json!({ "profile": saved })))
}
