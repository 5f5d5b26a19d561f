// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pool-managed session handles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use herald_core::{DeliveryChannel, HeraldError, MessageId, OutboundMessage, TenantId};
use tokio::time::Instant;

/// Last-use clock shared between a session's handles and its supervisor.
#[derive(Clone)]
pub(crate) struct Activity {
    origin: Instant,
    last_ms: Arc<AtomicU64>,
}

impl Activity {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn touch(&self) {
        let elapsed = self.origin.elapsed().as_millis() as u64;
        self.last_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    pub(crate) fn last_used(&self) -> Instant {
        self.origin + Duration::from_millis(self.last_ms.load(Ordering::Relaxed))
    }
}

/// A connected tenant session handed out by the pool.
///
/// Cloning is cheap; all clones share the same channel. Every send resets
/// the session's idle timer, so a session in active use is never evicted.
#[derive(Clone)]
pub struct Session {
    tenant: TenantId,
    channel: Arc<dyn DeliveryChannel>,
    activity: Activity,
}

impl Session {
    pub(crate) fn new(tenant: TenantId, channel: Arc<dyn DeliveryChannel>, activity: Activity) -> Self {
        Self {
            tenant,
            channel,
            activity,
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// When this session was last acquired or used to send.
    pub fn last_used(&self) -> Instant {
        self.activity.last_used()
    }

    pub(crate) fn touch(&self) {
        self.activity.touch();
    }

    /// Whether two handles refer to the same underlying channel.
    pub fn same_channel(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.channel, &other.channel)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DeliveryChannel for Session {
    async fn send(&self, msg: &OutboundMessage) -> Result<MessageId, HeraldError> {
        self.activity.touch();
        let result = self.channel.send(msg).await;
        self.activity.touch();
        result
    }

    async fn close(&self) -> Result<(), HeraldError> {
        self.channel.close().await
    }

    async fn logout(&self) -> Result<(), HeraldError> {
        self.channel.logout().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn touch_moves_last_used_forward_only() {
        let activity = Activity::new();
        let start = activity.last_used();

        tokio::time::advance(Duration::from_secs(5)).await;
        activity.touch();
        let touched = activity.last_used();
        assert_eq!(touched - start, Duration::from_secs(5));

        // A clone shares the clock.
        let other = activity.clone();
        tokio::time::advance(Duration::from_secs(1)).await;
        other.touch();
        assert_eq!(activity.last_used() - start, Duration::from_secs(6));
    }
}
