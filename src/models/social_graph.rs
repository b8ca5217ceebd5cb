// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// Counts derived from the edge set for one address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStats {
    pub followers_count: i64,
    pub following_count: i64,
    /// Whether the viewer (if one was given) follows this address
    pub is_following: bool,
}
