// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::ChainError;

/// Backoff for HTTP 429 responses. Opt-in per call site; nothing retries by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further failure
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `op`, retrying only rate-limit failures with exponential backoff
pub async fn retry_on_rate_limit<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_rate_limited() && attempt < policy.max_attempts => {
                let delay = policy.backoff_for(attempt);
                warn!("Rate limited (attempt {}/{}), retrying in {:?}", attempt, policy.max_attempts, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
