// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chain::OnChainProfile;
use crate::schema::profile_extensions;

/// Off-chain profile fields keyed by the same address as the on-chain profile
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = profile_extensions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProfileExtension {
    pub address: String,
    pub website: String,
    pub location: String,
    pub banner_url: String,
    pub joined_date_visibility: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProfileExtension {
    pub fn empty(address: &str) -> Self {
        Self {
            address: address.to_string(),
            website: String::new(),
            location: String::new(),
            banner_url: String::new(),
            joined_date_visibility: true,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// On-chain profile merged with its off-chain extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedProfile {
    pub address: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub website: String,
    pub location: String,
    pub banner_url: String,
    pub joined_date_visibility: bool,
}

impl MergedProfile {
    pub fn merge(chain: OnChainProfile, extension: Option<ProfileExtension>) -> Self {
        let extension = extension.unwrap_or_else(|| ProfileExtension::empty(&chain.address));
        Self {
            address: chain.address,
            display_name: chain.display_name,
            bio: chain.bio,
            avatar_url: chain.avatar_url,
            website: extension.website,
            location: extension.location,
            banner_url: extension.banner_url,
            joined_date_visibility: extension.joined_date_visibility,
        }
    }
}
