// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::uploads;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = uploads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    /// Hex sha256 of the stored bytes
    pub hash: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploader: Option<String>,
    pub created_at: DateTime<Utc>,
}
