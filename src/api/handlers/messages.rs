// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::routes::{canonical, read_payload, SignaturePolicy};
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::models::message::derive_contacts;

/// Longest accepted message body, in characters
const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub user_address: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadBody {
    pub user_address: Option<String>,
    pub contact: Option<String>,
}

/// The conversation with `contact`, or the user's contact list derived from every
/// message they sent or received
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut required = Required::new();
    let user = required.take("userAddress", query.user_address);
    required.finish()?;
    let user = canonical(&user)?;
    let store = state.store()?;

    match query.contact.filter(|c| !c.is_empty()) {
        Some(contact) => {
            let messages = store.conversation(&user, &canonical(&contact)?).await?;
            Ok(Json(json!({ "messages": messages })))
        }
        None => {
            let messages = store.messages_involving(&user).await?;
            Ok(Json(json!({ "contacts": derive_contacts(&user, &messages) })))
        }
    }
}

pub async fn send_message(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: SendBody = read_payload(&state, body, SignaturePolicy::Optional, |b: &SendBody| b.sender.as_deref())?;

    let mut required = Required::new();
    let sender = required.take("sender", body.sender);
    let receiver = required.take("receiver", body.receiver);
    let content = required.take("content", body.content);
    required.finish()?;

    let content = content.trim();
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message exceeds {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let message = store
        .send_message(&canonical(&sender)?, &canonical(&receiver)?, content)
        .await?;
    Ok(Json(json!({ "message": message })))
}

/// Mark everything `contact` sent to the user as read
pub async fn mark_read(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: MarkReadBody = read_payload(&state, body, SignaturePolicy::Optional, |b: &MarkReadBody| {
        b.user_address.as_deref()
    })?;

    let mut required = Required::new();
    let user = required.take("userAddress", body.user_address);
    let contact = required.take("contact", body.contact);
    required.finish()?;

    let updated = store
        .mark_conversation_read(&canonical(&user)?, &canonical(&contact)?)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}
