// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

//! Off-chain social state. Handlers talk to [`SocialStore`]; [`PgStore`] backs it with
//! Postgres and [`MemoryStore`] keeps everything in process for tests and local runs.
//!
//! Every address handed to a store is expected to be canonical already.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::bookmark::Bookmark;
use crate::models::interaction::{InteractionKind, InteractionLists};
use crate::models::message::Message;
use crate::models::notification::{NewNotification, Notification};
use crate::models::profile::ProfileExtension;
use crate::models::social_graph::FollowStats;
use crate::models::tip::{NewTipRecord, TipDirection, TipRecord};
use crate::models::upload::UploadRecord;
use crate::models::view::ViewOutcome;
use crate::models::vote::{VoteSummary, VoteType};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("store not configured: missing {}", .0.join(", "))]
    NotConfigured(Vec<&'static str>),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SocialStore: Send + Sync {
    /// Cheap round trip used by the health check
    async fn ping(&self) -> StoreResult<()>;

    /// Apply a vote: same type again removes it, the other type replaces it.
    /// Returns the caller's vote after the toggle.
    async fn toggle_vote(
        &self,
        post_id: &str,
        creator_address: &str,
        user_address: &str,
        vote: VoteType,
    ) -> StoreResult<Option<VoteType>>;
    async fn vote_summary(&self, post_id: &str, user_address: Option<&str>) -> StoreResult<VoteSummary>;

    /// Returns whether the post is bookmarked afterwards
    async fn toggle_bookmark(&self, user_address: &str, post_id: &str, creator_address: &str) -> StoreResult<bool>;
    async fn is_bookmarked(&self, user_address: &str, post_id: &str) -> StoreResult<bool>;
    async fn bookmarks_of(&self, user_address: &str) -> StoreResult<Vec<Bookmark>>;

    /// Returns whether `follower` follows `following` afterwards
    async fn toggle_follow(&self, follower: &str, following: &str) -> StoreResult<bool>;
    async fn follow_stats(&self, address: &str, viewer: Option<&str>) -> StoreResult<FollowStats>;
    async fn followers_of(&self, address: &str) -> StoreResult<Vec<String>>;
    async fn following_of(&self, address: &str) -> StoreResult<Vec<String>>;

    /// Toggle a mute, block or not-interested entry. Turning a block on also removes
    /// the follow edges in both directions, atomically with the block itself.
    async fn toggle_interaction(&self, kind: InteractionKind, user_address: &str, target: &str) -> StoreResult<bool>;
    async fn interactions_of(&self, user_address: &str) -> StoreResult<InteractionLists>;

    async fn send_message(&self, sender: &str, receiver: &str, content: &str) -> StoreResult<Message>;
    /// Both directions between `a` and `b`, oldest first
    async fn conversation(&self, a: &str, b: &str) -> StoreResult<Vec<Message>>;
    async fn messages_involving(&self, user_address: &str) -> StoreResult<Vec<Message>>;
    /// Mark everything `contact` sent to `reader` as read
    async fn mark_conversation_read(&self, reader: &str, contact: &str) -> StoreResult<usize>;

    async fn add_notification(&self, notification: NewNotification) -> StoreResult<Notification>;
    /// Newest first, at most `limit`
    async fn recent_notifications(&self, user_address: &str, limit: i64) -> StoreResult<Vec<Notification>>;
    async fn unread_notification_count(&self, user_address: &str) -> StoreResult<i64>;
    /// Mark one notification (when `id` is given) or all unread ones as read
    async fn mark_notifications_read(&self, user_address: &str, id: Option<i32>) -> StoreResult<usize>;
    async fn clear_notifications(&self, user_address: &str) -> StoreResult<usize>;

    async fn record_tip(&self, tip: NewTipRecord) -> StoreResult<TipRecord>;
    /// Newest first; `None` returns both directions
    async fn tips_for(&self, address: &str, direction: Option<TipDirection>) -> StoreResult<Vec<TipRecord>>;

    /// Count a view once per viewer hash
    async fn record_view(&self, post_id: &str, viewer_hash: &str) -> StoreResult<ViewOutcome>;
    async fn view_count(&self, post_id: &str) -> StoreResult<i64>;

    async fn profile_extension(&self, address: &str) -> StoreResult<Option<ProfileExtension>>;
    async fn upsert_profile_extension(&self, extension: ProfileExtension) -> StoreResult<ProfileExtension>;

    /// Content-addressed, so recording the same hash twice keeps the first record
    async fn record_upload(&self, upload: UploadRecord) -> StoreResult<UploadRecord>;
}
