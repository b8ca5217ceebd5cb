// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-user filters that share the toggle shape: a row keyed by (user, target)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Hide a user's posts; target is an address
    Mute,
    /// Mute plus severing follow edges both ways; target is an address
    Block,
    /// Hide one post; target is a post id
    NotInterested,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Mute => "mute",
            InteractionKind::Block => "block",
            InteractionKind::NotInterested => "not_interested",
        }
    }

    /// Whether the target is an address (as opposed to a post id)
    pub fn targets_user(&self) -> bool {
        !matches!(self, InteractionKind::NotInterested)
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "mute" => Ok(InteractionKind::Mute),
            "block" => Ok(InteractionKind::Block),
            "not_interested" | "notinterested" => Ok(InteractionKind::NotInterested),
            other => Err(format!("unknown interaction {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionLists {
    pub muted: Vec<String>,
    pub blocked: Vec<String>,
    pub not_interested: Vec<String>,
}
