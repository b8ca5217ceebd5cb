// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::address::to_canonical_address;
use crate::config::ChainConfig;
use crate::metrics::METRICS;
use crate::network::{NetworkProfile, NetworkResolver};

use super::payload::{EntryFunctionPayload, PayloadBuilder};
use super::retry::{retry_on_rate_limit, RetryPolicy};
use super::signer::TransactionSigner;
use super::types::{
    FeedAggregate, FeedEvent, NodeErrorBody, NodeResource, NodeTransaction, OnChainProfile, Post,
    TipRegistry, TopTipper, TransactionReceipt,
};
use super::ChainError;

const FEED_RESOURCE: &str = "Feed";
const PROFILE_RESOURCE: &str = "UserProfile";
const TIP_REGISTRY_RESOURCE: &str = "TipRegistry";
const TOP_TIPPER_STRUCT: &str = "TopTipper";

const EVENT_CHANNEL_CAPACITY: usize = 64;

struct CachedFeed {
    fetched_at: Instant,
    feed: Arc<FeedAggregate>,
}

/// Reads feed resources from the node and submits feed transactions.
///
/// Reads never fail: a missing resource is the normal empty state, and any other error
/// is logged and served as the empty/default value. Writes surface every error.
pub struct ChainClient {
    http: Client,
    resolver: Arc<NetworkResolver>,
    module_name: String,
    confirm_timeout: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
    cache_ttl: Duration,
    cache: Arc<Mutex<Option<CachedFeed>>>,
    events: broadcast::Sender<FeedEvent>,
}

impl ChainClient {
    pub fn new(resolver: Arc<NetworkResolver>, config: &ChainConfig) -> Result<Self, ChainError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let cache: Arc<Mutex<Option<CachedFeed>>> = Arc::new(Mutex::new(None));

        // A network switch makes every cached read stale
        let on_switch = cache.clone();
        resolver.on_change(move |profile| {
            debug!("Dropping cached feed after switch to {}", profile.network);
            if let Ok(mut cached) = on_switch.lock() {
                cached.take();
            }
        });

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            http,
            resolver,
            module_name: config.module_name.clone(),
            confirm_timeout: config.confirm_timeout(),
            poll_interval: config.poll_interval(),
            retry: RetryPolicy::default(),
            cache_ttl: config.feed_cache_ttl(),
            cache,
            events,
        })
    }

    /// Override the 429 backoff used by feed reads
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Receive an event after every confirmed write
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn profile(&self) -> NetworkProfile {
        self.resolver.active_profile()
    }

    /// Payload builder bound to the active network's module
    pub fn payloads(&self) -> PayloadBuilder {
        PayloadBuilder::new(self.resolver.active_profile().module_address, self.module_name.clone())
    }

    fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.cache.lock() {
            cached.take();
        }
    }

    fn cached_feed(&self) -> Option<Arc<FeedAggregate>> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        let cached = self.cache.lock().ok()?;
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.cache_ttl)
            .map(|c| c.feed.clone())
    }

    fn store_feed(&self, feed: Arc<FeedAggregate>) {
        if self.cache_ttl.is_zero() {
            return;
        }
        if let Ok(mut cached) = self.cache.lock() {
            *cached = Some(CachedFeed { fetched_at: Instant::now(), feed });
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ChainError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ChainError::RateLimited);
        }
        if !status.is_success() {
            let body: NodeErrorBody = response.json().await.unwrap_or_default();
            let not_found = status == StatusCode::NOT_FOUND
                || body.error_code.as_deref().map_or(false, |c| c.ends_with("not_found"));
            if not_found {
                return Err(ChainError::NotFound(body.message));
            }
            return Err(ChainError::Api {
                status: status.as_u16(),
                message: body.message,
                error_code: body.error_code,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn get_resource<T: DeserializeOwned>(&self, account: &str, resource_type: &str) -> Result<T, ChainError> {
        METRICS.chain_requests.with_label_values(&["resource"]).inc();
        let url = format!(
            "{}/accounts/{}/resource/{}",
            self.resolver.active_profile().rpc_url,
            to_canonical_address(account),
            resource_type
        );
        debug!("Fetching resource {}", url);
        let response = self.http.get(&url).send().await?;
        let resource: NodeResource<T> = Self::decode(response).await?;
        Ok(resource.data)
    }

    async fn get_table_item<T: DeserializeOwned>(
        &self,
        handle: &str,
        key_type: &str,
        value_type: &str,
        key: serde_json::Value,
    ) -> Result<T, ChainError> {
        METRICS.chain_requests.with_label_values(&["table_item"]).inc();
        let url = format!("{}/tables/{}/item", self.resolver.active_profile().rpc_url, handle);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "key_type": key_type, "value_type": value_type, "key": key }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_transaction(&self, hash: &str) -> Result<NodeTransaction, ChainError> {
        METRICS.chain_requests.with_label_values(&["transaction"]).inc();
        let url = format!("{}/transactions/by_hash/{}", self.resolver.active_profile().rpc_url, hash);
        let response = self.http.get(&url).send().await?;
        Self::decode(response).await
    }

    /// Degrade a read failure to `default`, logging anything but not-found
    fn or_default<T>(result: Result<T, ChainError>, what: &str, default: impl FnOnce() -> T) -> T {
        match result {
            Ok(value) => value,
            Err(e) if e.is_not_found() => {
                METRICS.chain_not_found.inc();
                debug!("{} not found on chain, using default", what);
                default()
            }
            Err(e) => {
                warn!("Failed to read {} from chain: {}", what, e);
                default()
            }
        }
    }

    /// Fetch the feed aggregate. A missing resource means nothing has been posted yet.
    pub async fn try_fetch_aggregate_feed(&self) -> Result<Arc<FeedAggregate>, ChainError> {
        if let Some(feed) = self.cached_feed() {
            return Ok(feed);
        }

        let payloads = self.payloads();
        let module_address = self.resolver.active_profile().module_address;
        let resource_type = payloads.resource_type(FEED_RESOURCE);
        let fetched = retry_on_rate_limit(self.retry, || {
            self.get_resource::<FeedAggregate>(&module_address, &resource_type)
        })
        .await;

        let feed = match fetched {
            Ok(feed) => Arc::new(feed),
            Err(e) if e.is_not_found() => {
                METRICS.chain_not_found.inc();
                debug!("Feed resource not initialized yet");
                Arc::new(FeedAggregate::default())
            }
            Err(e) => return Err(e),
        };
        self.store_feed(feed.clone());
        Ok(feed)
    }

    pub async fn fetch_aggregate_feed(&self) -> Arc<FeedAggregate> {
        Self::or_default(self.try_fetch_aggregate_feed().await, "feed", Default::default)
    }

    /// Page through live top-level posts, newest first
    pub async fn fetch_posts(&self, offset: usize, limit: usize) -> Vec<Post> {
        self.fetch_aggregate_feed().await.feed_page(offset, limit)
    }

    pub async fn fetch_post(&self, id: u64) -> Option<Post> {
        self.fetch_aggregate_feed().await.find(id)
    }

    pub async fn fetch_comments_of(&self, parent_id: u64) -> Vec<Post> {
        self.fetch_aggregate_feed().await.comments_of(parent_id)
    }

    pub async fn fetch_user_posts(&self, address: &str, offset: usize, limit: usize) -> Vec<Post> {
        self.fetch_aggregate_feed().await.by_creator(address, offset, limit)
    }

    /// On-chain profile, or an empty one for addresses that never set it
    pub async fn fetch_profile(&self, address: &str) -> OnChainProfile {
        let resource_type = self.payloads().resource_type(PROFILE_RESOURCE);
        let result = self.get_resource::<OnChainProfile>(address, &resource_type).await;
        let mut profile = Self::or_default(result, "profile", || OnChainProfile::empty(address));
        profile.address = to_canonical_address(address);
        profile
    }

    async fn tip_registry(&self) -> Result<TipRegistry, ChainError> {
        let module_address = self.resolver.active_profile().module_address;
        let resource_type = self.payloads().resource_type(TIP_REGISTRY_RESOURCE);
        self.get_resource(&module_address, &resource_type).await
    }

    /// Total base units tipped to `address`
    pub async fn fetch_total_tips_received(&self, address: &str) -> u64 {
        let result = async {
            let registry = self.tip_registry().await?;
            let total: String = self
                .get_table_item(
                    &registry.tips_by_address.handle,
                    "address",
                    "u64",
                    json!(to_canonical_address(address)),
                )
                .await?;
            total.parse::<u64>().map_err(|e| ChainError::Decode(e.to_string()))
        }
        .await;
        Self::or_default(result, "tip total", || 0)
    }

    /// Largest tipper of `address`, if anyone ever tipped them
    pub async fn fetch_top_tipper(&self, address: &str) -> Option<TopTipper> {
        let value_type = self.payloads().resource_type(TOP_TIPPER_STRUCT);
        let result = async {
            let registry = self.tip_registry().await?;
            self.get_table_item::<TopTipper>(
                &registry.top_tippers.handle,
                "address",
                &value_type,
                json!(to_canonical_address(address)),
            )
            .await
            .map(Some)
        }
        .await;
        Self::or_default(result, "top tipper", || None)
    }

    /// Poll the node until `hash` commits, fails, or the confirmation window closes
    pub async fn wait_for_transaction(&self, hash: &str) -> Result<TransactionReceipt, ChainError> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            match self.get_transaction(hash).await {
                Ok(tx) if !tx.is_pending() => {
                    let vm_status = tx.vm_status.unwrap_or_default();
                    if tx.success != Some(true) {
                        return Err(ChainError::Transaction { hash: tx.hash, vm_status });
                    }
                    let version = tx
                        .version
                        .as_deref()
                        .unwrap_or("0")
                        .parse()
                        .map_err(|e: std::num::ParseIntError| ChainError::Decode(e.to_string()))?;
                    return Ok(TransactionReceipt { hash: tx.hash, version, vm_status, events: tx.events });
                }
                Ok(_) => debug!("Transaction {} still pending", hash),
                Err(e) if e.is_not_found() => debug!("Transaction {} not visible yet", hash),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(ChainError::Timeout { hash: hash.to_string() });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn submit(
        &self,
        signer: &dyn TransactionSigner,
        payload: EntryFunctionPayload,
        event: impl FnOnce(&TransactionReceipt) -> FeedEvent,
    ) -> Result<TransactionReceipt, ChainError> {
        let function = payload.function_name().to_string();
        METRICS.chain_requests.with_label_values(&["submit"]).inc();

        let hash = signer.sign_and_submit(&payload).await.map_err(|reason| {
            error!("Signer rejected {}: {}", function, reason);
            ChainError::Signer(reason)
        })?;
        debug!("Submitted {} as {}", function, hash);

        let receipt = self.wait_for_transaction(&hash).await.map_err(|e| {
            error!("Transaction {} for {} did not succeed: {}", hash, function, e);
            e
        })?;
        info!(
            "Confirmed {} in version {}: {}",
            function,
            receipt.version,
            self.profile().explorer_tx_url(&receipt.hash)
        );

        self.invalidate_cache();
        // No subscribers is fine
        let _ = self.events.send(event(&receipt));
        Ok(receipt)
    }

    pub async fn initialize(&self, signer: &dyn TransactionSigner) -> Result<TransactionReceipt, ChainError> {
        let payload = self.payloads().initialize();
        self.submit(signer, payload, |r| FeedEvent::Initialized { hash: r.hash.clone() }).await
    }

    pub async fn submit_post(
        &self,
        signer: &dyn TransactionSigner,
        content: &str,
        image_url: &str,
        style: u8,
    ) -> Result<TransactionReceipt, ChainError> {
        let payload = self.payloads().create_post(content, image_url, style);
        self.submit(signer, payload, |r| FeedEvent::PostCreated {
            hash: r.hash.clone(),
            post_id: r.created_post_id(),
        })
        .await
    }

    pub async fn submit_comment(
        &self,
        signer: &dyn TransactionSigner,
        parent_id: u64,
        content: &str,
        image_url: &str,
    ) -> Result<TransactionReceipt, ChainError> {
        let payload = self.payloads().create_comment(parent_id, content, image_url);
        self.submit(signer, payload, |r| FeedEvent::CommentCreated {
            hash: r.hash.clone(),
            parent_id,
            comment_id: r.created_post_id(),
        })
        .await
    }

    pub async fn submit_edit(
        &self,
        signer: &dyn TransactionSigner,
        post_id: u64,
        content: &str,
        image_url: &str,
    ) -> Result<TransactionReceipt, ChainError> {
        let payload = self.payloads().edit_post_with_image(post_id, content, image_url);
        self.submit(signer, payload, |r| FeedEvent::PostEdited { hash: r.hash.clone(), post_id })
            .await
    }

    pub async fn submit_delete(
        &self,
        signer: &dyn TransactionSigner,
        post_id: u64,
    ) -> Result<TransactionReceipt, ChainError> {
        let payload = self.payloads().delete_post(post_id);
        self.submit(signer, payload, |r| FeedEvent::PostDeleted { hash: r.hash.clone(), post_id })
            .await
    }

    pub async fn submit_profile_update(
        &self,
        signer: &dyn TransactionSigner,
        display_name: &str,
        bio: &str,
        avatar_url: &str,
    ) -> Result<TransactionReceipt, ChainError> {
        let payload = self.payloads().update_profile(display_name, bio, avatar_url);
        self.submit(signer, payload, |r| FeedEvent::ProfileUpdated { hash: r.hash.clone() })
            .await
    }
}
