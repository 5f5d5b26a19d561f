// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background task that follows one connection attempt through its lifetime.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use herald_core::{ChannelEvent, DisconnectReason, TenantId};

use crate::pool::{AttemptFailure, PoolInner, Progress};
use crate::session::Activity;

/// Identity of the attempt a supervisor is responsible for.
pub(crate) struct Attempt {
    pub(crate) pool: Arc<PoolInner>,
    pub(crate) tenant: TenantId,
    pub(crate) generation: u64,
    pub(crate) activity: Activity,
}

/// Drives pairing expiry, idle eviction and disconnect handling for one attempt.
///
/// Returns a boxed future because reconnects start new supervisors from
/// inside this one.
pub(crate) fn supervise(
    attempt: Attempt,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    progress: watch::Sender<Progress>,
    cancel: CancellationToken,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let pool = Arc::clone(&attempt.pool);
        let pairing_deadline = Instant::now() + pool.config.pairing_timeout();
        let mut connected = false;
        let mut idle_deadline = pairing_deadline;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                _ = sleep_until(pairing_deadline), if !connected => {
                    if pool.expire_pairing(&attempt).await {
                        progress.send_replace(Progress::Failed(AttemptFailure::TimedOut(
                            pool.config.pairing_timeout(),
                        )));
                    }
                    break;
                }

                _ = sleep_until(idle_deadline), if connected => {
                    if pool.evict_idle(&attempt).await {
                        break;
                    }
                    idle_deadline = attempt.activity.last_used() + pool.config.idle_timeout();
                }

                event = events.recv() => match event {
                    Some(ChannelEvent::PairingChallenge(challenge)) => {
                        debug!(tenant = %attempt.tenant, "pairing challenge issued");
                        progress.send_replace(Progress::Challenge(challenge));
                    }
                    Some(ChannelEvent::Connected) => {
                        if connected {
                            continue;
                        }
                        if !pool.mark_connected(&attempt).await {
                            break;
                        }
                        connected = true;
                        idle_deadline = attempt.activity.last_used() + pool.config.idle_timeout();
                        progress.send_replace(Progress::Ready);
                    }
                    Some(ChannelEvent::Closed(reason)) => {
                        close_attempt(&attempt, &progress, reason).await;
                        break;
                    }
                    None => {
                        let reason = DisconnectReason::network("event stream ended");
                        close_attempt(&attempt, &progress, reason).await;
                        break;
                    }
                },
            }
        }
        debug!(tenant = %attempt.tenant, generation = attempt.generation, "supervisor stopped");
    })
}

async fn close_attempt(
    attempt: &Attempt,
    progress: &watch::Sender<Progress>,
    reason: DisconnectReason,
) {
    progress.send_replace(Progress::Failed(AttemptFailure::Closed(reason.to_string())));
    attempt.pool.handle_closed(attempt, reason).await;
}
