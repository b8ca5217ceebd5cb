// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::address::to_canonical_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewOutcome {
    pub views: i64,
    /// False when this viewer had already been counted for the post
    pub counted: bool,
}

/// Identity a view is deduplicated on: the wallet when connected, otherwise a salted
/// hash of the client's IP and user agent.
pub fn viewer_hash(wallet: Option<&str>, ip: &str, user_agent: &str, salt: &str) -> String {
    match wallet.map(to_canonical_address).filter(|w| !w.is_empty()) {
        Some(address) => format!("wallet_{}", address),
        None => {
            let mut hasher = Sha256::new();
            hasher.update(salt.as_bytes());
            hasher.update(b"|");
            hasher.update(ip.as_bytes());
            hasher.update(b"|");
            hasher.update(user_agent.as_bytes());
            format!("guest_{}", hex::encode(hasher.finalize()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_viewers_use_canonical_address() {
        let a = viewer_hash(Some("0xABC"), "1.1.1.1", "ua", "s");
        let b = viewer_hash(Some("abc"), "2.2.2.2", "other", "s");
        assert_eq!(a, b);
        assert!(a.starts_with("wallet_0x000"));
    }

    #[test]
    fn guests_hash_ip_and_agent_with_salt() {
        let a = viewer_hash(None, "1.1.1.1", "ua", "s");
        assert_eq!(a, viewer_hash(Some(""), "1.1.1.1", "ua", "s"));
        assert_ne!(a, viewer_hash(None, "1.1.1.2", "ua", "s"));
        assert_ne!(a, viewer_hash(None, "1.1.1.1", "ua", "pepper"));
        assert!(a.starts_with("guest_"));
        assert!(!a.contains("1.1.1.1"));
    }
}
