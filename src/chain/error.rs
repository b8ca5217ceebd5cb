// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("rate limited by node")]
    RateLimited,

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("node returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        error_code: Option<String>,
    },

    #[error("failed to decode node response: {0}")]
    Decode(String),

    #[error("transaction {hash} failed: {vm_status}")]
    Transaction { hash: String, vm_status: String },

    #[error("transaction {hash} was not confirmed in time")]
    Timeout { hash: String },

    #[error("signer rejected the transaction: {0}")]
    Signer(String),
}

impl ChainError {
    /// Not-found conditions are expected states (new user, nothing posted yet), whether
    /// typed as such or only recognisable from the node's message or error code.
    pub fn is_not_found(&self) -> bool {
        match self {
            ChainError::NotFound(_) => true,
            ChainError::Api { message, error_code, .. } => {
                mentions_not_found(message)
                    || error_code.as_deref().map_or(false, mentions_not_found)
            }
            other => mentions_not_found(&other.to_string()),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ChainError::RateLimited)
            || matches!(self, ChainError::Api { status: 429, .. })
    }
}

fn mentions_not_found(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("resource not found")
        || lower.contains("resource_not_found")
        || lower.contains("table_item_not_found")
        || lower.contains("account_not_found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_not_found_by_code_or_message() {
        assert!(ChainError::NotFound("x".into()).is_not_found());
        assert!(ChainError::Api {
            status: 400,
            message: "whatever".into(),
            error_code: Some("table_item_not_found".into()),
        }
        .is_not_found());
        assert!(ChainError::Api {
            status: 500,
            message: "Resource not found by Address".into(),
            error_code: None,
        }
        .is_not_found());
        assert!(!ChainError::RateLimited.is_not_found());
        assert!(!ChainError::Timeout { hash: "0x1".into() }.is_not_found());
    }
}
