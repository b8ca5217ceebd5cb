// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::schema::tips;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipDirection {
    Sent,
    Received,
}

impl TipDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipDirection::Sent => "sent",
            TipDirection::Received => "received",
        }
    }
}

impl FromStr for TipDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sent" => Ok(TipDirection::Sent),
            "received" => Ok(TipDirection::Received),
            other => Err(format!("unknown tip type {:?}", other)),
        }
    }
}

/// Off-chain copy of a confirmed tip, kept because the chain cannot cheaply answer
/// "tips sent by X"
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tips)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct TipRecord {
    pub id: i32,
    pub sender: String,
    pub receiver: String,
    /// Whole-token amount with up to eight decimals
    pub amount: BigDecimal,
    pub hash: String,
    pub post_id: Option<String>,
    #[serde(rename = "type")]
    pub tip_type: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tips)]
pub struct NewTipRecord {
    pub sender: String,
    pub receiver: String,
    pub amount: BigDecimal,
    pub hash: String,
    pub post_id: Option<String>,
    pub tip_type: String,
    pub created_at: DateTime<Utc>,
}
