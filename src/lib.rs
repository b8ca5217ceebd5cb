// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

pub mod address;
pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod network;
pub mod schema;
pub mod signature;
pub mod store;
