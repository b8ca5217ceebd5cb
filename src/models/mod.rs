// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

pub mod bookmark;
pub mod interaction;
pub mod message;
pub mod notification;
pub mod profile;
pub mod social_graph;
pub mod tip;
pub mod upload;
pub mod view;
pub mod vote;
