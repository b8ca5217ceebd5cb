// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "upvote" => Ok(VoteType::Up),
            "down" | "downvote" => Ok(VoteType::Down),
            other => Err(format!("unknown vote type {:?}", other)),
        }
    }
}

/// Tally for one post, plus the caller's own vote when known
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummary {
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_vote: Option<VoteType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_types_accept_long_names() {
        assert_eq!("Upvote".parse::<VoteType>().unwrap(), VoteType::Up);
        assert_eq!(" down ".parse::<VoteType>().unwrap(), VoteType::Down);
        assert!("sideways".parse::<VoteType>().is_err());
        assert_eq!(VoteType::Down.to_string(), "down");
    }
}
