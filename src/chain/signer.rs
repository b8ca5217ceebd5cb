// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use super::payload::EntryFunctionPayload;

/// Hands a payload to whoever holds the user's key (a wallet connection, a local
/// keystore) and returns the hash of the submitted transaction.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_and_submit(&self, payload: &EntryFunctionPayload) -> Result<String, String>;
}
