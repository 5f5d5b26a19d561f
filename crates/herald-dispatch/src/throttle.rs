// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Randomised pause between consecutive deliveries.

use std::time::Duration;

use herald_config::model::DispatchConfig;
use rand::Rng;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    base: Duration,
    jitter: Duration,
}

impl Throttle {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            Duration::from_millis(config.throttle_base_ms),
            Duration::from_millis(config.throttle_jitter_ms),
        )
    }

    /// Base delay plus a uniformly random share of the jitter.
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base + Duration::from_millis(extra)
    }

    /// Sleeps for the next delay. Returns false if cancelled first.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        let delay = self.next_delay();
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
