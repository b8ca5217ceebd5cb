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
use crate::models::notification::{NewNotification, NOTIFICATION_FETCH_LIMIT};

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBody {
    pub action: Option<String>,
    #[serde(alias = "address")]
    pub user_address: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub related_user: Option<String>,
    pub id: Option<i32>,
}

/// The 50 most recent notifications and the unread count
pub async fn get_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut required = Required::new();
    let address = required.take("address", query.address);
    required.finish()?;
    let address = canonical(&address)?;
    let store = state.store()?;

    let notifications = store.recent_notifications(&address, NOTIFICATION_FETCH_LIMIT).await?;
    let unread_count = store.unread_notification_count(&address).await?;
    Ok(Json(json!({
        "notifications": notifications,
        "unreadCount": unread_count,
    })))
}

/// `create`, `mark_read` (one id or all) or `clear`
pub async fn update_notifications(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    let body: NotificationBody = read_payload(&state, body, SignaturePolicy::Optional, |b: &NotificationBody| {
        b.user_address.as_deref()
    })?;

    let mut required = Required::new();
    let action = required.take("action", body.action);
    let user = required.take("userAddress", body.user_address);
    required.finish()?;
    let user = canonical(&user)?;

    match action.as_str() {
        "create" => {
            let mut required = Required::new();
            let message = required.take("message", body.message);
            let kind = required.take("type", body.notification_type);
            required.finish()?;

            let mut notification = NewNotification::new(&user, &kind, message);
            if let Some(related) = body.related_user.filter(|r| !r.is_empty()) {
                notification = notification.related_to(&canonical(&related)?);
            }
            let created = store.add_notification(notification).await?;
            Ok(Json(json!({ "notification": created })))
        }
        "mark_read" | "markRead" => {
            let updated = store.mark_notifications_read(&user, body.id).await?;
            Ok(Json(json!({ "updated": updated })))
        }
        "clear" => {
            let cleared = store.clear_notifications(&user).await?;
            Ok(Json(json!({ "cleared": cleared })))
        }
        other => Err(ApiError::BadRequest(format!("Unknown action {:?}", other))),
    }
}
