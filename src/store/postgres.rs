// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Varchar};
use diesel::sql_query;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{debug, warn};

use super::{SocialStore, StoreError, StoreResult};
use crate::db::{Database, DbConnection};
use crate::metrics;
use crate::models::bookmark::Bookmark;
use crate::models::interaction::{InteractionKind, InteractionLists};
use crate::models::message::{Message, NewMessage};
use crate::models::notification::{NewNotification, Notification};
use crate::models::profile::ProfileExtension;
use crate::models::social_graph::FollowStats;
use crate::models::tip::{NewTipRecord, TipDirection, TipRecord};
use crate::models::upload::UploadRecord;
use crate::models::view::ViewOutcome;
use crate::models::vote::{VoteSummary, VoteType};
use crate::schema::{
    blocks, bookmarks, follows, messages, mutes, not_interested, notifications, post_view_counts,
    profile_extensions, tips, uploads, votes,
};

// Each toggle is one statement: the DELETE and the guarded INSERT see the same snapshot,
// so the resulting state is reported without a separate read.

const TOGGLE_VOTE_SQL: &str = "\
WITH existing AS (
    SELECT id, vote_type FROM votes WHERE post_id = $1 AND user_address = $2 FOR UPDATE
),
removed AS (
    DELETE FROM votes v USING existing e
    WHERE v.id = e.id AND e.vote_type = $4
    RETURNING v.id
),
changed AS (
    UPDATE votes v SET vote_type = $4, updated_at = NOW()
    FROM existing e
    WHERE v.id = e.id AND e.vote_type <> $4
    RETURNING v.vote_type
),
inserted AS (
    INSERT INTO votes (post_id, creator_address, user_address, vote_type, created_at, updated_at)
    SELECT $1, $3, $2, $4, NOW(), NOW()
    WHERE NOT EXISTS (SELECT 1 FROM existing)
    ON CONFLICT (post_id, user_address) DO UPDATE SET vote_type = EXCLUDED.vote_type, updated_at = NOW()
    RETURNING vote_type
)
SELECT vote_type AS current FROM changed
UNION ALL
SELECT vote_type AS current FROM inserted";

const TOGGLE_BOOKMARK_SQL: &str = "\
WITH removed AS (
    DELETE FROM bookmarks WHERE user_address = $1 AND post_id = $2 RETURNING id
),
inserted AS (
    INSERT INTO bookmarks (user_address, post_id, creator_address, created_at)
    SELECT $1, $2, $3, NOW()
    WHERE NOT EXISTS (SELECT 1 FROM removed)
    ON CONFLICT (user_address, post_id) DO NOTHING
    RETURNING id
)
SELECT EXISTS (SELECT 1 FROM inserted) AS active";

const TOGGLE_FOLLOW_SQL: &str = "\
WITH removed AS (
    DELETE FROM follows WHERE follower_address = $1 AND following_address = $2 RETURNING id
),
inserted AS (
    INSERT INTO follows (follower_address, following_address, created_at)
    SELECT $1, $2, NOW()
    WHERE NOT EXISTS (SELECT 1 FROM removed)
    ON CONFLICT (follower_address, following_address) DO NOTHING
    RETURNING id
)
SELECT EXISTS (SELECT 1 FROM inserted) AS active";

fn toggle_target_sql(table: &str) -> String {
    format!(
        "WITH removed AS (
    DELETE FROM {table} WHERE user_address = $1 AND target = $2 RETURNING id
),
inserted AS (
    INSERT INTO {table} (user_address, target, created_at)
    SELECT $1, $2, NOW()
    WHERE NOT EXISTS (SELECT 1 FROM removed)
    ON CONFLICT (user_address, target) DO NOTHING
    RETURNING id
)
SELECT EXISTS (SELECT 1 FROM inserted) AS active"
    )
}

fn interaction_table(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Mute => "mutes",
        InteractionKind::Block => "blocks",
        InteractionKind::NotInterested => "not_interested",
    }
}

#[derive(QueryableByName)]
struct ToggleState {
    #[diesel(sql_type = Bool)]
    active: bool,
}

#[derive(QueryableByName)]
struct VoteState {
    #[diesel(sql_type = Varchar)]
    current: String,
}

#[derive(QueryableByName)]
struct ViewRow {
    #[diesel(sql_type = BigInt)]
    views: i64,
    #[diesel(sql_type = Bool)]
    counted: bool,
}

/// [`SocialStore`] over the Postgres tables created by the embedded migrations
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn conn(&self) -> StoreResult<DbConnection> {
        self.db.get_connection().await
    }
}

async fn toggle_target(conn: &mut AsyncPgConnection, kind: InteractionKind, user: &str, target: &str) -> QueryResult<bool> {
    let state = sql_query(toggle_target_sql(interaction_table(kind)))
        .bind::<Varchar, _>(user)
        .bind::<Varchar, _>(target)
        .get_result::<ToggleState>(conn)
        .await?;
    Ok(state.active)
}

#[async_trait]
impl SocialStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        sql_query("SELECT 1").execute(&mut conn).await?;
        Ok(())
    }

    async fn toggle_vote(
        &self,
        post_id: &str,
        creator_address: &str,
        user_address: &str,
        vote: VoteType,
    ) -> StoreResult<Option<VoteType>> {
        let mut conn = self.conn().await?;
        let rows = sql_query(TOGGLE_VOTE_SQL)
            .bind::<Varchar, _>(post_id)
            .bind::<Varchar, _>(user_address)
            .bind::<Varchar, _>(creator_address)
            .bind::<Varchar, _>(vote.as_str())
            .load::<VoteState>(&mut conn)
            .await?;

        let current = rows.into_iter().next().and_then(|row| row.current.parse().ok());
        debug!("Vote on {} by {} is now {:?}", post_id, user_address, current);
        Ok(current)
    }

    async fn vote_summary(&self, post_id: &str, user_address: Option<&str>) -> StoreResult<VoteSummary> {
        let mut conn = self.conn().await?;
        let tally: Vec<(String, i64)> = votes::table
            .filter(votes::post_id.eq(post_id))
            .group_by(votes::vote_type)
            .select((votes::vote_type, diesel::dsl::count_star()))
            .load(&mut conn)
            .await?;

        let mut summary = VoteSummary::default();
        for (vote_type, count) in tally {
            match vote_type.parse::<VoteType>() {
                Ok(VoteType::Up) => summary.upvotes = count,
                Ok(VoteType::Down) => summary.downvotes = count,
                Err(e) => warn!("Ignoring stored vote: {}", e),
            }
        }

        if let Some(user) = user_address {
            summary.user_vote = votes::table
                .filter(votes::post_id.eq(post_id))
                .filter(votes::user_address.eq(user))
                .select(votes::vote_type)
                .first::<String>(&mut conn)
                .await
                .optional()?
                .and_then(|v| v.parse().ok());
        }

        Ok(summary)
    }

    async fn toggle_bookmark(&self, user_address: &str, post_id: &str, creator_address: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let state = sql_query(TOGGLE_BOOKMARK_SQL)
            .bind::<Varchar, _>(user_address)
            .bind::<Varchar, _>(post_id)
            .bind::<Varchar, _>(creator_address)
            .get_result::<ToggleState>(&mut conn)
            .await?;
        Ok(state.active)
    }

    async fn is_bookmarked(&self, user_address: &str, post_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let count: i64 = bookmarks::table
            .filter(bookmarks::user_address.eq(user_address))
            .filter(bookmarks::post_id.eq(post_id))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok(count > 0)
    }

    async fn bookmarks_of(&self, user_address: &str) -> StoreResult<Vec<Bookmark>> {
        let mut conn = self.conn().await?;
        Ok(bookmarks::table
            .filter(bookmarks::user_address.eq(user_address))
            .order(bookmarks::created_at.desc())
            .select(Bookmark::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn toggle_follow(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let state = sql_query(TOGGLE_FOLLOW_SQL)
            .bind::<Varchar, _>(follower)
            .bind::<Varchar, _>(following)
            .get_result::<ToggleState>(&mut conn)
            .await?;
        Ok(state.active)
    }

    async fn follow_stats(&self, address: &str, viewer: Option<&str>) -> StoreResult<FollowStats> {
        let mut conn = self.conn().await?;
        let followers_count: i64 = follows::table
            .filter(follows::following_address.eq(address))
            .count()
            .get_result(&mut conn)
            .await?;
        let following_count: i64 = follows::table
            .filter(follows::follower_address.eq(address))
            .count()
            .get_result(&mut conn)
            .await?;

        let is_following = match viewer {
            Some(viewer) => {
                let edges: i64 = follows::table
                    .filter(follows::follower_address.eq(viewer))
                    .filter(follows::following_address.eq(address))
                    .count()
                    .get_result(&mut conn)
                    .await?;
                edges > 0
            }
            None => false,
        };

        Ok(FollowStats {
            followers_count,
            following_count,
            is_following,
        })
    }

    async fn followers_of(&self, address: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        Ok(follows::table
            .filter(follows::following_address.eq(address))
            .order(follows::created_at.desc())
            .select(follows::follower_address)
            .load(&mut conn)
            .await?)
    }

    async fn following_of(&self, address: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        Ok(follows::table
            .filter(follows::follower_address.eq(address))
            .order(follows::created_at.desc())
            .select(follows::following_address)
            .load(&mut conn)
            .await?)
    }

    async fn toggle_interaction(&self, kind: InteractionKind, user_address: &str, target: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        if kind != InteractionKind::Block {
            return Ok(toggle_target(&mut conn, kind, user_address, target).await?);
        }

        let active = conn
            .transaction::<bool, diesel::result::Error, _>(|conn| {
                async move {
                    let active = toggle_target(conn, InteractionKind::Block, user_address, target).await?;
                    if active {
                        diesel::delete(
                            follows::table.filter(
                                follows::follower_address
                                    .eq(user_address)
                                    .and(follows::following_address.eq(target))
                                    .or(follows::follower_address
                                        .eq(target)
                                        .and(follows::following_address.eq(user_address))),
                            ),
                        )
                        .execute(conn)
                        .await?;
                    }
                    Ok(active)
                }
                .scope_boxed()
            })
            .await?;
        Ok(active)
    }

    async fn interactions_of(&self, user_address: &str) -> StoreResult<InteractionLists> {
        let mut conn = self.conn().await?;
        let muted = mutes::table
            .filter(mutes::user_address.eq(user_address))
            .select(mutes::target)
            .load(&mut conn)
            .await?;
        let blocked = blocks::table
            .filter(blocks::user_address.eq(user_address))
            .select(blocks::target)
            .load(&mut conn)
            .await?;
        let not_interested = not_interested::table
            .filter(not_interested::user_address.eq(user_address))
            .select(not_interested::target)
            .load(&mut conn)
            .await?;
        Ok(InteractionLists {
            muted,
            blocked,
            not_interested,
        })
    }

    async fn send_message(&self, sender: &str, receiver: &str, content: &str) -> StoreResult<Message> {
        let mut conn = self.conn().await?;
        let message = NewMessage {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            read: false,
        };
        Ok(diesel::insert_into(messages::table)
            .values(&message)
            .returning(Message::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn conversation(&self, a: &str, b: &str) -> StoreResult<Vec<Message>> {
        let mut conn = self.conn().await?;
        Ok(messages::table
            .filter(
                messages::sender
                    .eq(a)
                    .and(messages::receiver.eq(b))
                    .or(messages::sender.eq(b).and(messages::receiver.eq(a))),
            )
            .order((messages::created_at.asc(), messages::id.asc()))
            .select(Message::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn messages_involving(&self, user_address: &str) -> StoreResult<Vec<Message>> {
        let mut conn = self.conn().await?;
        Ok(messages::table
            .filter(messages::sender.eq(user_address).or(messages::receiver.eq(user_address)))
            .order(messages::created_at.desc())
            .select(Message::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn mark_conversation_read(&self, reader: &str, contact: &str) -> StoreResult<usize> {
        let mut conn = self.conn().await?;
        Ok(diesel::update(
            messages::table
                .filter(messages::receiver.eq(reader))
                .filter(messages::sender.eq(contact))
                .filter(messages::read.eq(false)),
        )
        .set(messages::read.eq(true))
        .execute(&mut conn)
        .await?)
    }

    async fn add_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(notifications::table)
            .values(&notification)
            .returning(Notification::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn recent_notifications(&self, user_address: &str, limit: i64) -> StoreResult<Vec<Notification>> {
        let mut conn = self.conn().await?;
        Ok(notifications::table
            .filter(notifications::user_address.eq(user_address))
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .limit(limit)
            .select(Notification::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn unread_notification_count(&self, user_address: &str) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        Ok(notifications::table
            .filter(notifications::user_address.eq(user_address))
            .filter(notifications::read.eq(false))
            .count()
            .get_result(&mut conn)
            .await?)
    }

    async fn mark_notifications_read(&self, user_address: &str, id: Option<i32>) -> StoreResult<usize> {
        let mut conn = self.conn().await?;
        let unread = notifications::table
            .filter(notifications::user_address.eq(user_address))
            .filter(notifications::read.eq(false));
        let updated = match id {
            Some(id) => {
                diesel::update(unread.filter(notifications::id.eq(id)))
                    .set(notifications::read.eq(true))
                    .execute(&mut conn)
                    .await?
            }
            None => {
                diesel::update(unread)
                    .set(notifications::read.eq(true))
                    .execute(&mut conn)
                    .await?
            }
        };
        Ok(updated)
    }

    async fn clear_notifications(&self, user_address: &str) -> StoreResult<usize> {
        let mut conn = self.conn().await?;
        Ok(diesel::delete(notifications::table.filter(notifications::user_address.eq(user_address)))
            .execute(&mut conn)
            .await?)
    }

    async fn record_tip(&self, tip: NewTipRecord) -> StoreResult<TipRecord> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(tips::table)
            .values(&tip)
            .returning(TipRecord::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn tips_for(&self, address: &str, direction: Option<TipDirection>) -> StoreResult<Vec<TipRecord>> {
        let mut conn = self.conn().await?;
        let mut query = tips::table.select(TipRecord::as_select()).into_boxed();
        query = match direction {
            Some(TipDirection::Sent) => query.filter(tips::sender.eq(address)),
            Some(TipDirection::Received) => query.filter(tips::receiver.eq(address)),
            None => query.filter(tips::sender.eq(address).or(tips::receiver.eq(address))),
        };
        Ok(query
            .order((tips::created_at.desc(), tips::id.desc()))
            .load(&mut conn)
            .await?)
    }

    async fn record_view(&self, post_id: &str, viewer_hash: &str) -> StoreResult<ViewOutcome> {
        let mut conn = self.conn().await?;
        let result = sql_query("SELECT views, counted FROM record_post_view($1, $2)")
            .bind::<Varchar, _>(post_id)
            .bind::<Varchar, _>(viewer_hash)
            .get_result::<ViewRow>(&mut conn)
            .await;

        match result {
            Ok(row) => {
                metrics::record_view(row.counted, true);
                Ok(ViewOutcome {
                    views: row.views,
                    counted: row.counted,
                })
            }
            Err(e) if e.to_string().contains("does not exist") => {
                warn!("record_post_view unavailable, counting view without dedupe: {}", e);
                let views = diesel::insert_into(post_view_counts::table)
                    .values((post_view_counts::post_id.eq(post_id), post_view_counts::views.eq(1i64)))
                    .on_conflict(post_view_counts::post_id)
                    .do_update()
                    .set(post_view_counts::views.eq(post_view_counts::views + 1i64))
                    .returning(post_view_counts::views)
                    .get_result::<i64>(&mut conn)
                    .await?;
                metrics::record_view(true, false);
                Ok(ViewOutcome { views, counted: true })
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn view_count(&self, post_id: &str) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        Ok(post_view_counts::table
            .find(post_id)
            .select(post_view_counts::views)
            .first::<i64>(&mut conn)
            .await
            .optional()?
            .unwrap_or(0))
    }

    async fn profile_extension(&self, address: &str) -> StoreResult<Option<ProfileExtension>> {
        let mut conn = self.conn().await?;
        Ok(profile_extensions::table
            .find(address)
            .select(ProfileExtension::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn upsert_profile_extension(&self, extension: ProfileExtension) -> StoreResult<ProfileExtension> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(profile_extensions::table)
            .values(&extension)
            .on_conflict(profile_extensions::address)
            .do_update()
            .set(&extension)
            .returning(ProfileExtension::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn record_upload(&self, upload: UploadRecord) -> StoreResult<UploadRecord> {
        let mut conn = self.conn().await?;
        diesel::insert_into(uploads::table)
            .values(&upload)
            .on_conflict(uploads::hash)
            .do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(uploads::table
            .find(&upload.hash)
            .select(UploadRecord::as_select())
            .first(&mut conn)
            .await?)
    }
}
