// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{SocialStore, StoreResult};
use crate::metrics;
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

#[derive(Default)]
struct State {
    next_id: i32,
    /// (post_id, user) -> vote
    votes: HashMap<(String, String), VoteType>,
    bookmarks: Vec<Bookmark>,
    /// (follower, following), in insertion order
    follows: Vec<(String, String)>,
    interactions: HashMap<InteractionKind, BTreeSet<(String, String)>>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
    tips: Vec<TipRecord>,
    viewers: HashSet<(String, String)>,
    view_counts: HashMap<String, i64>,
    profiles: HashMap<String, ProfileExtension>,
    uploads: BTreeMap<String, UploadRecord>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// [`SocialStore`] kept in process memory; state is lost on restart
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SocialStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn toggle_vote(
        &self,
        post_id: &str,
        _creator_address: &str,
        user_address: &str,
        vote: VoteType,
    ) -> StoreResult<Option<VoteType>> {
        let mut state = self.state.lock().await;
        let key = (post_id.to_string(), user_address.to_string());
        let current = match state.votes.get(&key) {
            Some(existing) if *existing == vote => {
                state.votes.remove(&key);
                None
            }
            _ => {
                state.votes.insert(key, vote);
                Some(vote)
            }
        };
        Ok(current)
    }

    async fn vote_summary(&self, post_id: &str, user_address: Option<&str>) -> StoreResult<VoteSummary> {
        let state = self.state.lock().await;
        let mut summary = VoteSummary::default();
        for ((post, user), vote) in &state.votes {
            if post != post_id {
                continue;
            }
            match vote {
                VoteType::Up => summary.upvotes += 1,
                VoteType::Down => summary.downvotes += 1,
            }
            if Some(user.as_str()) == user_address {
                summary.user_vote = Some(*vote);
            }
        }
        Ok(summary)
    }

    async fn toggle_bookmark(&self, user_address: &str, post_id: &str, creator_address: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.bookmarks.len();
        state
            .bookmarks
            .retain(|b| !(b.user_address == user_address && b.post_id == post_id));
        if state.bookmarks.len() != before {
            return Ok(false);
        }

        let id = state.next_id();
        state.bookmarks.push(Bookmark {
            id,
            user_address: user_address.to_string(),
            post_id: post_id.to_string(),
            creator_address: creator_address.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn is_bookmarked(&self, user_address: &str, post_id: &str) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .bookmarks
            .iter()
            .any(|b| b.user_address == user_address && b.post_id == post_id))
    }

    async fn bookmarks_of(&self, user_address: &str) -> StoreResult<Vec<Bookmark>> {
        let state = self.state.lock().await;
        Ok(state
            .bookmarks
            .iter()
            .rev()
            .filter(|b| b.user_address == user_address)
            .cloned()
            .collect())
    }

    async fn toggle_follow(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.follows.len();
        state.follows.retain(|(a, b)| !(a == follower && b == following));
        if state.follows.len() != before {
            return Ok(false);
        }
        state.follows.push((follower.to_string(), following.to_string()));
        Ok(true)
    }

    async fn follow_stats(&self, address: &str, viewer: Option<&str>) -> StoreResult<FollowStats> {
        let state = self.state.lock().await;
        let mut stats = FollowStats::default();
        for (follower, following) in &state.follows {
            if following == address {
                stats.followers_count += 1;
                if Some(follower.as_str()) == viewer {
                    stats.is_following = true;
                }
            }
            if follower == address {
                stats.following_count += 1;
            }
        }
        Ok(stats)
    }

    async fn followers_of(&self, address: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .rev()
            .filter(|(_, following)| following == address)
            .map(|(follower, _)| follower.clone())
            .collect())
    }

    async fn following_of(&self, address: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .rev()
            .filter(|(follower, _)| follower == address)
            .map(|(_, following)| following.clone())
            .collect())
    }

    async fn toggle_interaction(&self, kind: InteractionKind, user_address: &str, target: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let key = (user_address.to_string(), target.to_string());
        let entries = state.interactions.entry(kind).or_default();
        let active = if entries.remove(&key) {
            false
        } else {
            entries.insert(key);
            true
        };

        if kind == InteractionKind::Block && active {
            state.follows.retain(|(a, b)| {
                !((a == user_address && b == target) || (a == target && b == user_address))
            });
        }
        Ok(active)
    }

    async fn interactions_of(&self, user_address: &str) -> StoreResult<InteractionLists> {
        let state = self.state.lock().await;
        let targets = |kind: InteractionKind| -> Vec<String> {
            state
                .interactions
                .get(&kind)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|(user, _)| user == user_address)
                        .map(|(_, target)| target.clone())
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(InteractionLists {
            muted: targets(InteractionKind::Mute),
            blocked: targets(InteractionKind::Block),
            not_interested: targets(InteractionKind::NotInterested),
        })
    }

    async fn send_message(&self, sender: &str, receiver: &str, content: &str) -> StoreResult<Message> {
        let mut state = self.state.lock().await;
        let message = Message {
            id: state.next_id(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            read: false,
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn conversation(&self, a: &str, b: &str) -> StoreResult<Vec<Message>> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| (m.sender == a && m.receiver == b) || (m.sender == b && m.receiver == a))
            .cloned()
            .collect())
    }

    async fn messages_involving(&self, user_address: &str) -> StoreResult<Vec<Message>> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .rev()
            .filter(|m| m.sender == user_address || m.receiver == user_address)
            .cloned()
            .collect())
    }

    async fn mark_conversation_read(&self, reader: &str, contact: &str) -> StoreResult<usize> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.receiver == reader && m.sender == contact && !m.read)
        {
            message.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn add_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
        let mut state = self.state.lock().await;
        let stored = Notification {
            id: state.next_id(),
            user_address: notification.user_address,
            message: notification.message,
            notification_type: notification.notification_type,
            created_at: notification.created_at,
            read: notification.read,
            related_user: notification.related_user,
        };
        state.notifications.push(stored.clone());
        Ok(stored)
    }

    async fn recent_notifications(&self, user_address: &str, limit: i64) -> StoreResult<Vec<Notification>> {
        let state = self.state.lock().await;
        let mut recent: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_address == user_address)
            .cloned()
            .collect();
        recent.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        recent.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(recent)
    }

    async fn unread_notification_count(&self, user_address: &str) -> StoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.user_address == user_address && !n.read)
            .count() as i64)
    }

    async fn mark_notifications_read(&self, user_address: &str, id: Option<i32>) -> StoreResult<usize> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for notification in state.notifications.iter_mut().filter(|n| {
            n.user_address == user_address && !n.read && id.map_or(true, |id| n.id == id)
        }) {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn clear_notifications(&self, user_address: &str) -> StoreResult<usize> {
        let mut state = self.state.lock().await;
        let before = state.notifications.len();
        state.notifications.retain(|n| n.user_address != user_address);
        Ok(before - state.notifications.len())
    }

    async fn record_tip(&self, tip: NewTipRecord) -> StoreResult<TipRecord> {
        let mut state = self.state.lock().await;
        let stored = TipRecord {
            id: state.next_id(),
            sender: tip.sender,
            receiver: tip.receiver,
            amount: tip.amount,
            hash: tip.hash,
            post_id: tip.post_id,
            tip_type: tip.tip_type,
            created_at: tip.created_at,
        };
        state.tips.push(stored.clone());
        Ok(stored)
    }

    async fn tips_for(&self, address: &str, direction: Option<TipDirection>) -> StoreResult<Vec<TipRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .tips
            .iter()
            .rev()
            .filter(|tip| match direction {
                Some(TipDirection::Sent) => tip.sender == address,
                Some(TipDirection::Received) => tip.receiver == address,
                None => tip.sender == address || tip.receiver == address,
            })
            .cloned()
            .collect())
    }

    async fn record_view(&self, post_id: &str, viewer_hash: &str) -> StoreResult<ViewOutcome> {
        let mut state = self.state.lock().await;
        let counted = state.viewers.insert((post_id.to_string(), viewer_hash.to_string()));
        let views = state.view_counts.entry(post_id.to_string()).or_insert(0);
        if counted {
            *views += 1;
        }
        let views = *views;
        metrics::record_view(counted, true);
        Ok(ViewOutcome { views, counted })
    }

    async fn view_count(&self, post_id: &str) -> StoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state.view_counts.get(post_id).copied().unwrap_or(0))
    }

    async fn profile_extension(&self, address: &str) -> StoreResult<Option<ProfileExtension>> {
        let state = self.state.lock().await;
        Ok(state.profiles.get(address).cloned())
    }

    async fn upsert_profile_extension(&self, extension: ProfileExtension) -> StoreResult<ProfileExtension> {
        let mut state = self.state.lock().await;
        state.profiles.insert(extension.address.clone(), extension.clone());
        Ok(extension)
    }

    async fn record_upload(&self, upload: UploadRecord) -> StoreResult<UploadRecord> {
        let mut state = self.state.lock().await;
        Ok(state.uploads.entry(upload.hash.clone()).or_insert(upload).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vote_toggle_is_tri_state() {
        let store = MemoryStore::new();
        assert_eq!(store.toggle_vote("1", "0xc", "0xu", VoteType::Up).await.unwrap(), Some(VoteType::Up));
        assert_eq!(store.toggle_vote("1", "0xc", "0xu", VoteType::Down).await.unwrap(), Some(VoteType::Down));

        let summary = store.vote_summary("1", Some("0xu")).await.unwrap();
        assert_eq!((summary.upvotes, summary.downvotes), (0, 1));
        assert_eq!(summary.user_vote, Some(VoteType::Down));

        assert_eq!(store.toggle_vote("1", "0xc", "0xu", VoteType::Down).await.unwrap(), None);
        assert_eq!(store.vote_summary("1", Some("0xu")).await.unwrap(), VoteSummary::default());
    }

    #[tokio::test]
    async fn block_severs_follow_edges_both_ways() {
        let store = MemoryStore::new();
        store.toggle_follow("0xa", "0xb").await.unwrap();
        store.toggle_follow("0xb", "0xa").await.unwrap();
        store.toggle_follow("0xa", "0xc").await.unwrap();

        assert!(store.toggle_interaction(InteractionKind::Block, "0xa", "0xb").await.unwrap());
        assert_eq!(store.following_of("0xa").await.unwrap(), vec!["0xc".to_string()]);
        assert!(store.followers_of("0xa").await.unwrap().is_empty());
        assert_eq!(store.interactions_of("0xa").await.unwrap().blocked, vec!["0xb".to_string()]);

        // Unblocking does not restore edges
        assert!(!store.toggle_interaction(InteractionKind::Block, "0xa", "0xb").await.unwrap());
        assert_eq!(store.follow_stats("0xb", None).await.unwrap().followers_count, 0);
    }

    #[tokio::test]
    async fn views_count_once_per_viewer() {
        let store = MemoryStore::new();
        let recorded = || metrics::METRICS.views_recorded.with_label_values(&["true"]).get();
        let before = recorded();

        assert_eq!(store.record_view("7", "guest_a").await.unwrap(), ViewOutcome { views: 1, counted: true });
        assert_eq!(recorded(), before + 1);
        assert_eq!(store.record_view("7", "guest_a").await.unwrap(), ViewOutcome { views: 1, counted: false });
        assert_eq!(recorded(), before + 1);
        assert_eq!(store.record_view("7", "wallet_b").await.unwrap(), ViewOutcome { views: 2, counted: true });
        assert_eq!(recorded(), before + 2);
        assert_eq!(store.view_count("7").await.unwrap(), 2);
        assert_eq!(store.view_count("8").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_read_targets_one_or_all() {
        let store = MemoryStore::new();
        let first = store
            .add_notification(NewNotification::new("0xa", "follow", "one"))
            .await
            .unwrap();
        store.add_notification(NewNotification::new("0xa", "tip", "two")).await.unwrap();
        store.add_notification(NewNotification::new("0xb", "tip", "other")).await.unwrap();

        assert_eq!(store.mark_notifications_read("0xa", Some(first.id)).await.unwrap(), 1);
        assert_eq!(store.unread_notification_count("0xa").await.unwrap(), 1);
        assert_eq!(store.mark_notifications_read("0xa", None).await.unwrap(), 1);
        assert_eq!(store.unread_notification_count("0xa").await.unwrap(), 0);
        assert_eq!(store.clear_notifications("0xa").await.unwrap(), 2);
        assert_eq!(store.unread_notification_count("0xb").await.unwrap(), 1);
    }
}
