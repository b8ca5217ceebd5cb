// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

//! Shapes of the on-chain resources as the node's JSON API renders them.
//!
//! Move `u64` values arrive as decimal strings and `Option<T>` as `{"vec": [..]}`; the
//! deserializers here accept those alongside plain JSON numbers and nulls.

use serde::{Deserialize, Deserializer, Serialize};

use crate::address::to_canonical_address;

fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_u8<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = de_u64(deserializer)?;
    u8::try_from(value).map_err(serde::de::Error::custom)
}

fn de_move_option_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Move { vec: Vec<serde_json::Value> },
        Number(u64),
        Text(String),
        Null,
    }

    let parse = |value: &serde_json::Value| -> Result<u64, D::Error> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| serde::de::Error::custom("expected an unsigned integer")),
            serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!("unexpected option payload {}", other))),
        }
    };

    match Repr::deserialize(deserializer)? {
        Repr::Move { vec } => vec.first().map(parse).transpose(),
        Repr::Number(n) => Ok(Some(n)),
        Repr::Text(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        Repr::Null => Ok(None),
    }
}

fn de_address<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(to_canonical_address(&raw))
}

/// A post or comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Post {
    #[serde(deserialize_with = "de_u64")]
    pub id: u64,
    #[serde(alias = "creator", deserialize_with = "de_address")]
    pub creator_address: String,
    pub content: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, deserialize_with = "de_u8")]
    pub style: u8,
    #[serde(default, deserialize_with = "de_u64")]
    pub total_tips: u64,
    #[serde(deserialize_with = "de_u64")]
    pub timestamp: u64,
    #[serde(default, deserialize_with = "de_move_option_u64")]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub is_comment: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, deserialize_with = "de_u64")]
    pub updated_at: u64,
}

impl Post {
    /// Deleted posts keep their row on chain; callers only ever see the tombstone
    pub fn redacted(mut self) -> Self {
        if self.is_deleted {
            self.content.clear();
            self.image_url.clear();
        }
        self
    }
}

/// The single resource holding every post and comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAggregate {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub comments: Vec<Post>,
}

fn newest_first(items: &mut [Post]) {
    items.sort_by(|a, b| b.id.cmp(&a.id));
}

fn page(items: Vec<Post>, offset: usize, limit: usize) -> Vec<Post> {
    items.into_iter().skip(offset).take(limit).collect()
}

impl FeedAggregate {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.comments.is_empty()
    }

    /// Live top-level posts, newest first, sliced
    pub fn feed_page(&self, offset: usize, limit: usize) -> Vec<Post> {
        let mut live: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| !p.is_deleted && !p.is_comment)
            .cloned()
            .collect();
        newest_first(&mut live);
        page(live, offset, limit)
    }

    /// Find a post or comment by id; deleted ones come back redacted
    pub fn find(&self, id: u64) -> Option<Post> {
        self.posts
            .iter()
            .chain(self.comments.iter())
            .find(|p| p.id == id)
            .cloned()
            .map(Post::redacted)
    }

    /// Live comments on `parent_id`, newest first
    pub fn comments_of(&self, parent_id: u64) -> Vec<Post> {
        let mut comments: Vec<Post> = self
            .comments
            .iter()
            .filter(|c| c.parent_id == Some(parent_id) && !c.is_deleted)
            .cloned()
            .collect();
        newest_first(&mut comments);
        comments
    }

    /// Live top-level posts by one creator, newest first, sliced
    pub fn by_creator(&self, address: &str, offset: usize, limit: usize) -> Vec<Post> {
        let creator = to_canonical_address(address);
        let mut mine: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.creator_address == creator && !p.is_deleted && !p.is_comment)
            .cloned()
            .collect();
        newest_first(&mut mine);
        page(mine, offset, limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct OnChainProfile {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
}

impl OnChainProfile {
    pub fn empty(address: &str) -> Self {
        Self {
            address: to_canonical_address(address),
            ..Default::default()
        }
    }
}

/// Table handle as embedded in a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle {
    pub handle: String,
}

/// Donation registry stored under the module account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipRegistry {
    pub tips_by_address: TableHandle,
    pub top_tippers: TableHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTipper {
    #[serde(alias = "tipper", deserialize_with = "de_address")]
    pub address: String,
    #[serde(deserialize_with = "de_u64")]
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Committed transaction as returned once confirmation completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionReceipt {
    pub hash: String,
    pub version: u64,
    pub vm_status: String,
    pub events: Vec<ChainEvent>,
}

impl TransactionReceipt {
    /// Id of the post or comment created by this transaction, read from its events
    pub fn created_post_id(&self) -> Option<u64> {
        self.events
            .iter()
            .filter(|e| e.event_type.ends_with("::PostCreated") || e.event_type.ends_with("::CommentCreated"))
            .find_map(|e| {
                let id = e.data.get("post_id").or_else(|| e.data.get("comment_id"))?;
                match id {
                    serde_json::Value::String(s) => s.parse().ok(),
                    serde_json::Value::Number(n) => n.as_u64(),
                    _ => None,
                }
            })
    }
}

/// Transaction as the node reports it, pending or committed
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NodeTransaction {
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub vm_status: Option<String>,
    #[serde(default)]
    pub events: Vec<ChainEvent>,
}

impl NodeTransaction {
    pub fn is_pending(&self) -> bool {
        self.kind == "pending_transaction"
    }
}

/// Resource envelope: `{"type": "...", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NodeResource<T> {
    pub data: T,
}

/// Error body the node returns with non-2xx statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct NodeErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Broadcast after every confirmed write so listeners can refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    PostCreated { hash: String, post_id: Option<u64> },
    CommentCreated { hash: String, parent_id: u64, comment_id: Option<u64> },
    PostEdited { hash: String, post_id: u64 },
    PostDeleted { hash: String, post_id: u64 },
    ProfileUpdated { hash: String },
    Initialized { hash: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(id: u64, creator: &str, deleted: bool) -> Post {
        Post {
            id,
            creator_address: to_canonical_address(creator),
            content: format!("post {}", id),
            image_url: String::new(),
            style: 0,
            total_tips: 0,
            timestamp: 1_000 + id,
            parent_id: None,
            is_comment: false,
            is_deleted: deleted,
            updated_at: 1_000 + id,
        }
    }

    #[test]
    fn decodes_move_json() {
        let raw = json!({
            "id": "12",
            "creator": "0xA1",
            "content": "gm",
            "image_url": "",
            "style": 2,
            "total_tips": "150000000",
            "timestamp": "1700000000",
            "parent_id": { "vec": ["3"] },
            "is_comment": true,
            "is_deleted": false,
            "updated_at": "1700000000"
        });
        let post: Post = serde_json::from_value(raw).unwrap();
        assert_eq!(post.id, 12);
        assert_eq!(post.creator_address, to_canonical_address("0xa1"));
        assert_eq!(post.parent_id, Some(3));
        assert_eq!(post.total_tips, 150_000_000);

        let none: Post = serde_json::from_value(json!({
            "id": 1, "creator_address": "0x1", "content": "", "timestamp": 5,
            "parent_id": { "vec": [] }
        }))
        .unwrap();
        assert_eq!(none.parent_id, None);
        assert!(!none.is_deleted);
    }

    #[test]
    fn paging_is_newest_first_and_skips_deleted() {
        let feed = FeedAggregate {
            posts: vec![post(1, "0xa", false), post(3, "0xb", false), post(2, "0xa", true), post(4, "0xa", false)],
            comments: vec![],
        };
        let ids: Vec<u64> = feed.feed_page(0, 10).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4, 3, 1]);
        let ids: Vec<u64> = feed.feed_page(1, 1).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3]);
        let ids: Vec<u64> = feed.by_creator("0x0a", 0, 10).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4, 1]);
    }

    #[test]
    fn deleted_posts_are_redacted_on_lookup() {
        let feed = FeedAggregate { posts: vec![post(2, "0xa", true)], comments: vec![] };
        let found = feed.find(2).unwrap();
        assert!(found.is_deleted);
        assert!(found.content.is_empty());
        assert!(feed.find(9).is_none());
    }

    #[test]
    fn comments_are_grouped_by_parent() {
        let mut c1 = post(10, "0xa", false);
        c1.is_comment = true;
        c1.parent_id = Some(1);
        let mut c2 = post(11, "0xb", false);
        c2.is_comment = true;
        c2.parent_id = Some(1);
        let mut other = post(12, "0xb", false);
        other.is_comment = true;
        other.parent_id = Some(2);
        let feed = FeedAggregate { posts: vec![post(1, "0xa", false)], comments: vec![c1, c2, other] };

        let ids: Vec<u64> = feed.comments_of(1).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![11, 10]);
        assert_eq!(feed.find(12).unwrap().parent_id, Some(2));
    }

    #[test]
    fn receipt_exposes_created_id() {
        let receipt = TransactionReceipt {
            hash: "0xabc".into(),
            version: 7,
            vm_status: "Executed successfully".into(),
            events: vec![
                ChainEvent { event_type: "0x1::coin::WithdrawEvent".into(), data: json!({}) },
                ChainEvent { event_type: "0xfeed::feed::PostCreated".into(), data: json!({ "post_id": "42" }) },
            ],
        };
        assert_eq!(receipt.created_post_id(), Some(42));
    }
}
