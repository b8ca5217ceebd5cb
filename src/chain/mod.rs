// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

mod client;
mod error;
mod payload;
mod retry;
mod signer;
mod types;

pub use client::ChainClient;
pub use error::ChainError;
pub use payload::{EntryFunctionPayload, FeedFunction, PayloadBuilder};
pub use retry::{retry_on_rate_limit, RetryPolicy};
pub use signer::TransactionSigner;
pub use types::{
    ChainEvent, FeedAggregate, FeedEvent, OnChainProfile, Post, TableHandle, TipRegistry,
    TopTipper, TransactionReceipt,
};
