// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::notifications;

/// Most recent notifications returned per fetch
pub const NOTIFICATION_FETCH_LIMIT: i64 = 50;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i32,
    pub user_address: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub related_user: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_address: String,
    pub message: String,
    pub notification_type: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub related_user: Option<String>,
}

impl NewNotification {
    pub fn new(user_address: &str, notification_type: &str, message: impl Into<String>) -> Self {
        Self {
            user_address: user_address.to_string(),
            message: message.into(),
            notification_type: notification_type.to_string(),
            created_at: Utc::now(),
            read: false,
            related_user: None,
        }
    }

    pub fn related_to(mut self, address: &str) -> Self {
        self.related_user = Some(address.to_string());
        self
    }
}
