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

use crate::address::{base_units_to_decimal, format_amount, parse_amount};
use crate::api::routes::{canonical, read_payload, string_or_number, SignaturePolicy};
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::models::notification::NewNotification;
use crate::models::tip::{NewTipRecord, TipDirection};

#[derive(Debug, Deserialize)]
pub struct TipsQuery {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub direction: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipBody {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    /// Whole tokens, e.g. "0.5"
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub post_id: Option<String>,
}

/// Off-chain tip history, plus the on-chain total received by the address
pub async fn get_tips(State(state): State<AppState>, Query(query): Query<TipsQuery>) -> Result<Json<Value>, ApiError> {
    let mut required = Required::new();
    let address = required.take("address", query.address);
    required.finish()?;
    let address = canonical(&address)?;
    let direction = query
        .direction
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<TipDirection>())
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let tips = state.store()?.tips_for(&address, direction).await?;
    let total_received = state.chain.fetch_total_tips_received(&address).await;
    Ok(Json(json!({
        "tips": tips,
        "totalReceived": format_amount(total_received),
    })))
}

/// Persist a confirmed tip transaction and notify the receiver
pub async fn record_tip(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: TipBody = read_payload(&state, body, SignaturePolicy::Optional, |b: &TipBody| b.sender.as_deref())?;

    let mut required = Required::new();
    let sender = required.take("sender", body.sender);
    let receiver = required.take("receiver", body.receiver);
    let amount = required.take("amount", body.amount);
    let hash = required.take("hash", body.hash);
    required.finish()?;

    let sender = canonical(&sender)?;
    let receiver = canonical(&receiver)?;
    let units = parse_amount(&amount)?;
    if units == 0 {
        return Err(ApiError::BadRequest("Tip amount must be positive".to_string()));
    }

    let tip = store
        .record_tip(NewTipRecord {
            sender: sender.clone(),
            receiver: receiver.clone(),
            amount: base_units_to_decimal(units),
            hash,
            post_id: body.post_id.filter(|id| !id.is_empty()),
            tip_type: TipDirection::Sent.as_str().to_string(),
            created_at: Utc::now(),
        })
        .await?;

    let notification = NewNotification::new(
        &receiver,
        "tip",
        format!("{} tipped you {} MOVE", sender, format_amount(units)),
    )
    .related_to(&sender);
    if let Err(e) = store.add_notification(notification).await {
        warn!("Failed to notify {} of tip: {}", receiver, e);
    }

    Ok(Json(json!({ "tip": tip })))
}
