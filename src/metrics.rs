// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    pub registry: Registry,
    pub chain_requests: IntCounterVec,
    pub chain_not_found: IntCounter,
    pub toggles: IntCounterVec,
    pub views_recorded: IntCounterVec,
}

pub static METRICS: Lazy<Metrics> = Lazy::new(|| {
    let registry = Registry::new();

    let chain_requests = IntCounterVec::new(
        Opts::new("movefeed_chain_requests_total", "Requests sent to the chain node"),
        &["kind"],
    )
    .expect("valid metric definition");
    let chain_not_found = IntCounter::new(
        "movefeed_chain_not_found_total",
        "Chain reads answered with not-found and served as empty",
    )
    .expect("valid metric definition");
    let toggles = IntCounterVec::new(
        Opts::new("movefeed_toggles_total", "Toggle operations by feature and resulting state"),
        &["feature", "state"],
    )
    .expect("valid metric definition");
    let views_recorded = IntCounterVec::new(
        Opts::new("movefeed_views_recorded_total", "View increments by counting path"),
        &["deduplicated"],
    )
    .expect("valid metric definition");

    for collector in [
        Box::new(chain_requests.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(chain_not_found.clone()),
        Box::new(toggles.clone()),
        Box::new(views_recorded.clone()),
    ] {
        registry.register(collector).expect("metric registered once");
    }

    Metrics {
        registry,
        chain_requests,
        chain_not_found,
        toggles,
        views_recorded,
    }
});

/// Count a toggle outcome
pub fn record_toggle(feature: &str, active: bool) {
    let state = if active { "on" } else { "off" };
    METRICS.toggles.with_label_values(&[feature, state]).inc();
}

/// Count a view that raised a post's counter; repeat views are not counted.
/// `deduplicated` is false when the store fell back to a plain increment.
pub fn record_view(counted: bool, deduplicated: bool) {
    if counted {
        let label = if deduplicated { "true" } else { "false" };
        METRICS.views_recorded.with_label_values(&[label]).inc();
    }
}

/// Render all metrics in the Prometheus text format
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&METRICS.registry.gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
