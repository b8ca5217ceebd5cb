// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

pub mod bookmarks;
pub mod follow;
pub mod health;
pub mod interactions;
pub mod messages;
pub mod network;
pub mod notifications;
pub mod posts;
pub mod profile;
pub mod tips;
pub mod upload;
pub mod views;
pub mod votes;
