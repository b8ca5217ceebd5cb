// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use diesel::allow_tables_to_appear_in_same_query;
use diesel::table;

table! {
    votes (id) {
        id -> Integer,
        post_id -> Varchar,
        creator_address -> Varchar,
        user_address -> Varchar,
        vote_type -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    bookmarks (id) {
        id -> Integer,
        user_address -> Varchar,
        post_id -> Varchar,
        creator_address -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    follows (id) {
        id -> Integer,
        follower_address -> Varchar,
        following_address -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    mutes (id) {
        id -> Integer,
        user_address -> Varchar,
        target -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    blocks (id) {
        id -> Integer,
        user_address -> Varchar,
        target -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    not_interested (id) {
        id -> Integer,
        user_address -> Varchar,
        target -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    messages (id) {
        id -> Integer,
        sender -> Varchar,
        receiver -> Varchar,
        content -> Text,
        created_at -> Timestamptz,
        read -> Bool,
    }
}

table! {
    notifications (id) {
        id -> Integer,
        user_address -> Varchar,
        message -> Text,
        notification_type -> Varchar,
        created_at -> Timestamptz,
        read -> Bool,
        related_user -> Nullable<Varchar>,
    }
}

table! {
    tips (id) {
        id -> Integer,
        sender -> Varchar,
        receiver -> Varchar,
        amount -> Numeric,
        hash -> Varchar,
        post_id -> Nullable<Varchar>,
        tip_type -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    post_views (post_id, viewer_hash) {
        post_id -> Varchar,
        viewer_hash -> Varchar,
        viewed_at -> Timestamptz,
    }
}

table! {
    post_view_counts (post_id) {
        post_id -> Varchar,
        views -> BigInt,
    }
}

table! {
    profile_extensions (address) {
        address -> Varchar,
        website -> Varchar,
        location -> Varchar,
        banner_url -> Varchar,
        joined_date_visibility -> Bool,
        updated_at -> Timestamptz,
    }
}

table! {
    uploads (hash) {
        hash -> Varchar,
        file_name -> Varchar,
        content_type -> Varchar,
        size_bytes -> BigInt,
        uploader -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

allow_tables_to_appear_in_same_query!(
    votes,
    bookmarks,
    follows,
    mutes,
    blocks,
    not_interested,
    messages,
    notifications,
    tips,
    post_views,
    post_view_counts,
    profile_extensions,
    uploads,
);
