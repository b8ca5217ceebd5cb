// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

//! Chain client against an in-process node that speaks the subset of the REST API the
//! client uses. The test signer executes payloads directly against the node's state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use movefeed::address::to_canonical_address;
use movefeed::chain::{
    ChainClient, ChainError, EntryFunctionPayload, FeedEvent, OnChainProfile, RetryPolicy, TransactionSigner,
};
use movefeed::config::Config;
use movefeed::network::{Network, NetworkResolver};

struct FakePost {
    id: u64,
    creator: String,
    content: String,
    image_url: String,
    style: u64,
    parent: Option<u64>,
    deleted: bool,
    timestamp: u64,
    updated_at: u64,
}

impl FakePost {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id.to_string(),
            "creator": self.creator,
            "content": self.content,
            "image_url": self.image_url,
            "style": self.style,
            "total_tips": "0",
            "timestamp": self.timestamp.to_string(),
            "parent_id": { "vec": self.parent.map(|p| vec![p.to_string()]).unwrap_or_default() },
            "is_comment": self.parent.is_some(),
            "is_deleted": self.deleted,
            "updated_at": self.updated_at.to_string(),
        })
    }
}

#[derive(Default)]
struct Node {
    initialized: bool,
    posts: Vec<FakePost>,
    next_id: u64,
    clock: u64,
    tx_counter: u64,
    /// hash -> (polls left while pending, committed transaction)
    transactions: HashMap<String, (u32, Value)>,
    profiles: HashMap<String, Value>,
    /// Feed reads answered with 429 before serving normally
    rate_limited_reads: u32,
}

type SharedNode = Arc<Mutex<Node>>;

fn not_found(code: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Resource not found", "error_code": code })),
    )
        .into_response()
}

async fn get_resource(State(node): State<SharedNode>, Path((address, resource)): Path<(String, String)>) -> Response {
    let mut node = node.lock().unwrap();
    if resource.ends_with("::Feed") {
        if node.rate_limited_reads > 0 {
            node.rate_limited_reads -= 1;
            return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "message": "slow down" }))).into_response();
        }
        if !node.initialized {
            return not_found("resource_not_found");
        }
        let (comments, posts): (Vec<&FakePost>, Vec<&FakePost>) = node.posts.iter().partition(|p| p.parent.is_some());
        return Json(json!({
            "type": resource,
            "data": {
                "posts": posts.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
                "comments": comments.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
            }
        }))
        .into_response();
    }
    if resource.ends_with("::UserProfile") {
        if let Some(profile) = node.profiles.get(&to_canonical_address(&address)) {
            return Json(json!({ "type": resource, "data": profile })).into_response();
        }
    }
    not_found("resource_not_found")
}

async fn get_transaction(State(node): State<SharedNode>, Path(hash): Path<String>) -> Response {
    let mut node = node.lock().unwrap();
    match node.transactions.get_mut(&hash) {
        None => not_found("transaction_not_found"),
        Some((pending, _)) if *pending > 0 => {
            *pending -= 1;
            Json(json!({ "type": "pending_transaction", "hash": hash })).into_response()
        }
        Some((_, committed)) => Json(committed.clone()).into_response(),
    }
}

async fn spawn_node(node: SharedNode) -> String {
    let app = Router::new()
        .route("/v1/accounts/:address/resource/:resource", get(get_resource))
        .route("/v1/transactions/by_hash/:hash", get(get_transaction))
        .with_state(node);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn arg_str(payload: &EntryFunctionPayload, index: usize) -> String {
    payload.arguments[index].as_str().unwrap_or_default().to_string()
}

fn arg_u64(payload: &EntryFunctionPayload, index: usize) -> u64 {
    match &payload.arguments[index] {
        Value::String(s) => s.parse().unwrap(),
        other => other.as_u64().unwrap(),
    }
}

/// Executes payloads as `address` the way the feed module would
struct TestSigner {
    node: SharedNode,
    address: String,
    reject: bool,
}

impl TestSigner {
    fn new(node: &SharedNode, address: &str) -> Self {
        Self {
            node: node.clone(),
            address: to_canonical_address(address),
            reject: false,
        }
    }
}

#[async_trait]
impl TransactionSigner for TestSigner {
    async fn sign_and_submit(&self, payload: &EntryFunctionPayload) -> Result<String, String> {
        if self.reject {
            return Err("User rejected the request".to_string());
        }

        let mut node = self.node.lock().unwrap();
        node.clock += 1;
        node.tx_counter += 1;
        let now = node.clock;
        let module = payload.function.rsplit_once("::").map(|(m, _)| m.to_string()).unwrap_or_default();
        let mut events = Vec::new();
        let mut abort = None;

        match payload.function_name() {
            "initialize" => node.initialized = true,
            "create_post" | "create_comment" => {
                let is_comment = payload.function_name() == "create_comment";
                let (parent, content, image_url, style) = if is_comment {
                    (Some(arg_u64(payload, 0)), arg_str(payload, 1), arg_str(payload, 2), 0)
                } else {
                    (None, arg_str(payload, 0), arg_str(payload, 1), arg_u64(payload, 2))
                };
                node.next_id += 1;
                let id = node.next_id;
                node.posts.push(FakePost {
                    id,
                    creator: self.address.clone(),
                    content,
                    image_url,
                    style,
                    parent,
                    deleted: false,
                    timestamp: now,
                    updated_at: now,
                });
                events.push(if is_comment {
                    json!({ "type": format!("{}::CommentCreated", module), "data": { "comment_id": id.to_string() } })
                } else {
                    json!({ "type": format!("{}::PostCreated", module), "data": { "post_id": id.to_string() } })
                });
            }
            "edit_post_with_image" | "delete_post" => {
                let id = arg_u64(payload, 0);
                let edit = payload.function_name() == "edit_post_with_image";
                let (content, image_url) = if edit {
                    (arg_str(payload, 1), arg_str(payload, 2))
                } else {
                    Default::default()
                };
                let signer = self.address.clone();
                match node.posts.iter_mut().find(|p| p.id == id) {
                    Some(post) if post.creator == signer => {
                        if edit {
                            post.content = content;
                            post.image_url = image_url;
                        } else {
                            post.deleted = true;
                        }
                        post.updated_at = now;
                    }
                    Some(_) => abort = Some("Move abort in feed: E_NOT_CREATOR(0x2)"),
                    None => abort = Some("Move abort in feed: E_POST_NOT_FOUND(0x1)"),
                }
            }
            "update_profile" => {
                let profile = json!({
                    "display_name": arg_str(payload, 0),
                    "bio": arg_str(payload, 1),
                    "avatar_url": arg_str(payload, 2),
                });
                let address = self.address.clone();
                node.profiles.insert(address, profile);
            }
            other => return Err(format!("unknown function {}", other)),
        }

        let hash = format!("0x{:064x}", node.tx_counter);
        let committed = json!({
            "type": "user_transaction",
            "hash": hash,
            "version": (1000 + node.tx_counter).to_string(),
            "success": abort.is_none(),
            "vm_status": abort.unwrap_or("Executed successfully"),
            "events": events,
        });
        node.transactions.insert(hash.clone(), (1, committed));
        Ok(hash)
    }
}

async fn setup() -> (SharedNode, ChainClient) {
    let node = SharedNode::default();
    let rpc_url = spawn_node(node.clone()).await;

    let mut config = Config::local(std::env::temp_dir().join("movefeed-chain-test.json"));
    config.chain.profiles.testnet.rpc_url = rpc_url;
    let resolver = Arc::new(NetworkResolver::new(config.chain.profiles.clone(), None, Some(Network::Testnet)));
    let client = ChainClient::new(resolver, &config.chain)
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
        });
    (node, client)
}

#[test_log::test(tokio::test)]
async fn create_edit_delete_round_trip() {
    let (node, client) = setup().await;
    let alice = TestSigner::new(&node, "0xa11ce");
    let mut events = client.subscribe();

    client.initialize(&alice).await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), FeedEvent::Initialized { .. }));

    let receipt = client.submit_post(&alice, "hello", "", 0).await.unwrap();
    let id = receipt.created_post_id().expect("post id in events");
    assert_eq!(
        events.recv().await.unwrap(),
        FeedEvent::PostCreated { hash: receipt.hash.clone(), post_id: Some(id) }
    );

    let post = client.fetch_post(id).await.unwrap();
    assert_eq!(post.content, "hello");
    assert!(!post.is_deleted);
    assert_eq!(post.creator_address, to_canonical_address("0xa11ce"));

    client.submit_edit(&alice, id, "hello v2", "ipfs://img").await.unwrap();
    let edited = client.fetch_post(id).await.unwrap();
    assert_eq!(edited.content, "hello v2");
    assert_eq!(edited.image_url, "ipfs://img");
    assert!(edited.updated_at > edited.timestamp);

    client.submit_delete(&alice, id).await.unwrap();
    match client.fetch_post(id).await {
        None => {}
        Some(deleted) => {
            assert!(deleted.is_deleted);
            assert!(!deleted.content.contains("hello"));
        }
    }
    assert!(client.fetch_posts(0, 10).await.is_empty());
}

#[tokio::test]
async fn comments_and_user_posts_derive_from_the_aggregate() {
    let (node, client) = setup().await;
    let alice = TestSigner::new(&node, "0xa11ce");
    let bob = TestSigner::new(&node, "0xb0b");

    client.initialize(&alice).await.unwrap();
    let first = client.submit_post(&alice, "first", "", 0).await.unwrap().created_post_id().unwrap();
    let second = client.submit_post(&bob, "second", "", 2).await.unwrap().created_post_id().unwrap();
    let third = client.submit_post(&alice, "third", "", 0).await.unwrap().created_post_id().unwrap();
    let comment = client
        .submit_comment(&bob, first, "nice", "")
        .await
        .unwrap()
        .created_post_id()
        .unwrap();

    let feed: Vec<u64> = client.fetch_posts(0, 10).await.iter().map(|p| p.id).collect();
    assert_eq!(feed, vec![third, second, first]);
    assert_eq!(client.fetch_posts(1, 1).await[0].id, second);

    let mine: Vec<u64> = client.fetch_user_posts("a11ce", 0, 10).await.iter().map(|p| p.id).collect();
    assert_eq!(mine, vec![third, first]);

    let comments = client.fetch_comments_of(first).await;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, comment);
    assert_eq!(comments[0].parent_id, Some(first));
    assert!(client.fetch_comments_of(second).await.is_empty());
}

#[tokio::test]
async fn missing_resources_read_as_empty() {
    let (_node, client) = setup().await;

    assert!(client.fetch_aggregate_feed().await.is_empty());
    assert!(client.fetch_posts(0, 20).await.is_empty());
    assert!(client.fetch_post(1).await.is_none());
    assert_eq!(client.fetch_profile("0xdead").await, OnChainProfile::empty("0xdead"));
    assert_eq!(client.fetch_total_tips_received("0xdead").await, 0);
    assert!(client.fetch_top_tipper("0xdead").await.is_none());
}

#[tokio::test]
async fn profile_updates_are_read_back() {
    let (node, client) = setup().await;
    let alice = TestSigner::new(&node, "0xa11ce");

    client
        .submit_profile_update(&alice, "Alice", "gm", "ipfs://avatar")
        .await
        .unwrap();
    let profile = client.fetch_profile("0x0a11ce").await;
    assert_eq!(profile.address, to_canonical_address("0xa11ce"));
    assert_eq!(profile.display_name, "Alice");
    assert_eq!(profile.bio, "gm");
    assert_eq!(profile.avatar_url, "ipfs://avatar");
}

#[test_log::test(tokio::test)]
async fn rate_limited_feed_reads_back_off_and_retry() {
    let (node, client) = setup().await;
    let alice = TestSigner::new(&node, "0xa11ce");
    client.initialize(&alice).await.unwrap();

    node.lock().unwrap().rate_limited_reads = 2;
    assert!(client.try_fetch_aggregate_feed().await.is_ok());

    node.lock().unwrap().rate_limited_reads = 5;
    let err = client.try_fetch_aggregate_feed().await.unwrap_err();
    assert!(err.is_rate_limited());
    // Reads degrade instead of failing
    node.lock().unwrap().rate_limited_reads = 5;
    assert!(client.fetch_posts(0, 10).await.is_empty());
}

#[tokio::test]
async fn write_failures_surface_to_the_caller() {
    let (node, client) = setup().await;
    let alice = TestSigner::new(&node, "0xa11ce");
    let mallory = TestSigner::new(&node, "0xbad");
    client.initialize(&alice).await.unwrap();
    let id = client.submit_post(&alice, "mine", "", 0).await.unwrap().created_post_id().unwrap();

    let err = client.submit_edit(&mallory, id, "pwned", "").await.unwrap_err();
    match err {
        ChainError::Transaction { vm_status, .. } => assert!(vm_status.contains("E_NOT_CREATOR")),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(client.fetch_post(id).await.unwrap().content, "mine");

    let rejecting = TestSigner {
        reject: true,
        ..TestSigner::new(&node, "0xa11ce")
    };
    let err = client.submit_delete(&rejecting, id).await.unwrap_err();
    assert!(matches!(err, ChainError::Signer(_)));
}
