// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection pool and its per-tenant state machine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use strum::Display;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_config::model::SessionsConfig;
use herald_core::{
    ChannelConnector, ConnectRequest, DeliveryChannel, DisconnectReason, HeraldError,
    PairingChallenge, SessionProvider, SessionStatus, SessionStore, TenantId,
};

use crate::session::{Activity, Session};
use crate::supervisor::{Attempt, supervise};

/// Observable state of a tenant's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PoolState {
    Absent,
    Pairing,
    Connected,
    ReconnectPending,
}

/// Result of [`ConnectionPool::acquire`].
#[derive(Debug, Clone)]
pub enum Acquired {
    /// The tenant has a usable session.
    Ready(Session),
    /// The operator must complete this challenge before the session opens.
    Challenge(PairingChallenge),
}

enum Joined {
    Ready(Session),
    Attempt(watch::Receiver<Progress>, u64),
    Failed(HeraldError),
}

/// Progress of one connection attempt, published to every caller waiting on it.
#[derive(Debug, Clone)]
pub(crate) enum Progress {
    Waiting,
    Challenge(PairingChallenge),
    Ready,
    Failed(AttemptFailure),
}

#[derive(Debug, Clone)]
pub(crate) enum AttemptFailure {
    TimedOut(Duration),
    Closed(String),
}

impl AttemptFailure {
    fn into_error(self, tenant: &TenantId) -> HeraldError {
        match self {
            AttemptFailure::TimedOut(duration) => HeraldError::Timeout { duration },
            AttemptFailure::Closed(reason) => unavailable(tenant, format!("connection closed: {reason}")),
        }
    }
}

fn unavailable(tenant: &TenantId, reason: impl Into<String>) -> HeraldError {
    HeraldError::SessionUnavailable {
        tenant: tenant.clone(),
        reason: reason.into(),
    }
}

enum SlotState {
    Absent,
    Pairing(watch::Receiver<Progress>),
    Connected(Session),
    ReconnectPending,
}

pub(crate) struct TenantSlot {
    state: SlotState,
    /// Bumped whenever the current attempt or session is replaced, so stale
    /// supervisors and reconnect timers can recognise themselves.
    generation: u64,
    channel: Option<Arc<dyn DeliveryChannel>>,
    cancel: Option<CancellationToken>,
    reconnect_failures: u32,
}

impl TenantSlot {
    fn new() -> Self {
        Self {
            state: SlotState::Absent,
            generation: 0,
            channel: None,
            cancel: None,
            reconnect_failures: 0,
        }
    }

    fn pool_state(&self) -> PoolState {
        match self.state {
            SlotState::Absent => PoolState::Absent,
            SlotState::Pairing(_) => PoolState::Pairing,
            SlotState::Connected(_) => PoolState::Connected,
            SlotState::ReconnectPending => PoolState::ReconnectPending,
        }
    }

    /// Returns the slot to `Absent`, stopping the supervisor and handing back
    /// the channel so the caller can close it while still holding the lock.
    fn reset(&mut self) -> Option<Arc<dyn DeliveryChannel>> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.generation += 1;
        self.state = SlotState::Absent;
        self.channel.take()
    }
}

async fn close_quietly(tenant: &TenantId, channel: Option<Arc<dyn DeliveryChannel>>) {
    if let Some(channel) = channel
        && let Err(e) = channel.close().await
    {
        warn!(tenant = %tenant, error = %e, "failed to close channel");
    }
}

pub(crate) struct PoolInner {
    pub(crate) config: SessionsConfig,
    connector: Arc<dyn ChannelConnector>,
    store: Arc<dyn SessionStore>,
    slots: DashMap<TenantId, Arc<Mutex<TenantSlot>>>,
    shutdown: CancellationToken,
}

impl PoolInner {
    fn slot(&self, tenant: &TenantId) -> Arc<Mutex<TenantSlot>> {
        let entry = self
            .slots
            .entry(tenant.clone())
            .or_insert_with(|| Arc::new(Mutex::new(TenantSlot::new())));
        Arc::clone(entry.value())
    }

    fn is_terminal(&self, reason: &DisconnectReason) -> bool {
        reason
            .code
            .is_some_and(|code| self.config.terminal_disconnect_codes.contains(&code))
    }

    /// Opens a new channel for the tenant and starts supervising it.
    ///
    /// Must be called with the tenant's slot locked.
    async fn begin_attempt(
        self: &Arc<Self>,
        tenant: &TenantId,
        slot: &mut TenantSlot,
    ) -> Result<watch::Receiver<Progress>, HeraldError> {
        close_quietly(tenant, slot.reset()).await;

        self.store.prepare(tenant).await?;
        let credentials = self.store.load(tenant).await?;
        let resumed = credentials.is_some();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let channel = self
            .connector
            .open(ConnectRequest {
                tenant: tenant.clone(),
                credentials,
                store: Arc::clone(&self.store),
                events: events_tx,
            })
            .await?;

        slot.generation += 1;
        let generation = slot.generation;
        let (progress_tx, progress_rx) = watch::channel(Progress::Waiting);
        let cancel = self.shutdown.child_token();
        let activity = Activity::new();

        slot.state = SlotState::Pairing(progress_rx.clone());
        slot.channel = Some(Arc::clone(&channel));
        slot.cancel = Some(cancel.clone());
        info!(tenant = %tenant, generation, resumed, "connection attempt started");

        let attempt = Attempt {
            pool: Arc::clone(self),
            tenant: tenant.clone(),
            generation,
            activity,
        };
        tokio::spawn(supervise(attempt, events_rx, progress_tx, cancel));
        Ok(progress_rx)
    }

    pub(crate) async fn mark_connected(&self, attempt: &Attempt) -> bool {
        let slot = self.slot(&attempt.tenant);
        let mut guard = slot.lock().await;
        if guard.generation != attempt.generation {
            return false;
        }
        let Some(channel) = guard.channel.clone() else {
            return false;
        };
        attempt.activity.touch();
        guard.state = SlotState::Connected(Session::new(
            attempt.tenant.clone(),
            channel,
            attempt.activity.clone(),
        ));
        guard.reconnect_failures = 0;
        info!(tenant = %attempt.tenant, generation = attempt.generation, "session connected");
        true
    }

    /// Abandons an attempt that never connected within the pairing timeout.
    pub(crate) async fn expire_pairing(&self, attempt: &Attempt) -> bool {
        let slot = self.slot(&attempt.tenant);
        let mut guard = slot.lock().await;
        if guard.generation != attempt.generation {
            return false;
        }
        warn!(
            tenant = %attempt.tenant,
            timeout_secs = self.config.pairing_timeout_secs,
            "pairing timed out; attempt abandoned"
        );
        close_quietly(&attempt.tenant, guard.reset()).await;
        true
    }

    /// Closes a connected session unused for the idle window. Returns false if
    /// it was used in the meantime or no longer belongs to this supervisor.
    pub(crate) async fn evict_idle(&self, attempt: &Attempt) -> bool {
        let slot = self.slot(&attempt.tenant);
        let mut guard = slot.lock().await;
        if guard.generation != attempt.generation {
            return true;
        }
        let due = attempt.activity.last_used() + self.config.idle_timeout();
        if due > Instant::now() {
            return false;
        }
        info!(
            tenant = %attempt.tenant,
            idle_secs = self.config.idle_timeout_secs,
            "idle session evicted"
        );
        close_quietly(&attempt.tenant, guard.reset()).await;
        true
    }

    /// Classifies a disconnect and applies the matching transition.
    pub(crate) async fn handle_closed(self: &Arc<Self>, attempt: &Attempt, reason: DisconnectReason) {
        let slot = self.slot(&attempt.tenant);
        let mut guard = slot.lock().await;
        if guard.generation != attempt.generation {
            return;
        }
        close_quietly(&attempt.tenant, guard.reset()).await;

        if self.is_terminal(&reason) {
            warn!(tenant = %attempt.tenant, %reason, "session invalidated; purging credentials");
            guard.reconnect_failures = 0;
            if let Err(e) = self.store.purge(&attempt.tenant).await {
                warn!(tenant = %attempt.tenant, error = %e, "failed to purge credentials");
            }
            return;
        }

        guard.reconnect_failures += 1;
        if guard.reconnect_failures > self.config.max_reconnect_attempts {
            warn!(
                tenant = %attempt.tenant,
                %reason,
                failures = guard.reconnect_failures,
                "giving up on automatic reconnects"
            );
            return;
        }
        guard.state = SlotState::ReconnectPending;
        warn!(
            tenant = %attempt.tenant,
            %reason,
            failures = guard.reconnect_failures,
            delay_secs = self.config.reconnect_delay_secs,
            "transient disconnect; reconnect scheduled"
        );
        let pool = Arc::clone(self);
        let tenant = attempt.tenant.clone();
        let scheduled = guard.generation;
        tokio::spawn(async move { pool.reconnect_after_delay(tenant, scheduled).await });
    }

    async fn reconnect_after_delay(self: Arc<Self>, tenant: TenantId, mut scheduled: u64) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.config.reconnect_delay()) => {}
            }

            let slot = self.slot(&tenant);
            let mut guard = slot.lock().await;
            if guard.generation != scheduled || !matches!(guard.state, SlotState::ReconnectPending) {
                debug!(tenant = %tenant, "scheduled reconnect superseded");
                return;
            }
            info!(tenant = %tenant, attempt = guard.reconnect_failures, "reconnecting");
            let window = self.config.pairing_window();
            let e = match tokio::time::timeout(window, self.begin_attempt(&tenant, &mut guard)).await {
                Ok(Ok(_)) => return,
                Ok(Err(e)) => e,
                Err(_) => HeraldError::Timeout { duration: window },
            };

            close_quietly(&tenant, guard.reset()).await;
            guard.reconnect_failures += 1;
            if guard.reconnect_failures > self.config.max_reconnect_attempts {
                warn!(tenant = %tenant, error = %e, "reconnect failed; giving up");
                return;
            }
            warn!(tenant = %tenant, error = %e, "reconnect failed; retrying");
            guard.state = SlotState::ReconnectPending;
            scheduled = guard.generation;
        }
    }
}

/// Registry of per-tenant messaging sessions.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(
        config: SessionsConfig,
        connector: Arc<dyn ChannelConnector>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                connector,
                store,
                slots: DashMap::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Returns the tenant's session, or starts (or joins) a connection attempt.
    ///
    /// A connected session is returned at once and its idle timer reset.
    /// Otherwise the call waits up to the pairing window for the attempt to
    /// either connect or issue a pairing challenge. The window covers opening
    /// the channel and waiting behind other callers too. If it runs out the
    /// attempt is abandoned and [`HeraldError::Timeout`] is returned.
    pub async fn acquire(&self, tenant: &TenantId) -> Result<Acquired, HeraldError> {
        let window = self.inner.config.pairing_window();
        let deadline = Instant::now() + window;

        let (mut progress, generation) =
            match tokio::time::timeout_at(deadline, self.start_or_join(tenant)).await {
                Ok(Joined::Ready(session)) => return Ok(Acquired::Ready(session)),
                Ok(Joined::Attempt(progress, generation)) => (progress, generation),
                Ok(Joined::Failed(e)) => return Err(e),
                Err(_) => {
                    warn!(tenant = %tenant, "channel did not open within the pairing window");
                    return Err(HeraldError::Timeout { duration: window });
                }
            };

        let seen = tokio::time::timeout_at(deadline, async {
            progress
                .wait_for(|p| !matches!(p, Progress::Waiting))
                .await
                .map(|p| p.clone())
        })
        .await;

        match seen {
            Err(_) => {
                self.abandon(tenant, generation).await;
                Err(HeraldError::Timeout { duration: window })
            }
            Ok(Err(_)) => Err(unavailable(tenant, "connection attempt ended")),
            Ok(Ok(Progress::Challenge(challenge))) => Ok(Acquired::Challenge(challenge)),
            Ok(Ok(Progress::Ready)) => self.connected_session(tenant).await.map(Acquired::Ready),
            Ok(Ok(Progress::Failed(failure))) => Err(failure.into_error(tenant)),
            Ok(Ok(Progress::Waiting)) => Err(HeraldError::Internal(
                "connection attempt reported no progress".to_string(),
            )),
        }
    }

    /// Locks the tenant's slot and either hands back its session or the
    /// progress of the attempt it is (now) running.
    ///
    /// Dropping this future mid-open releases the lock and leaves the slot
    /// `Absent`, so the next caller starts over.
    async fn start_or_join(&self, tenant: &TenantId) -> Joined {
        let slot = self.inner.slot(tenant);
        let mut guard = slot.lock().await;
        match &guard.state {
            SlotState::Connected(session) => {
                session.touch();
                debug!(tenant = %tenant, "reusing connected session");
                Joined::Ready(session.clone())
            }
            SlotState::Pairing(progress) => {
                debug!(tenant = %tenant, "joining in-flight connection attempt");
                Joined::Attempt(progress.clone(), guard.generation)
            }
            SlotState::Absent | SlotState::ReconnectPending => {
                guard.reconnect_failures = 0;
                match self.inner.begin_attempt(tenant, &mut guard).await {
                    Ok(progress) => Joined::Attempt(progress, guard.generation),
                    Err(e) => Joined::Failed(e),
                }
            }
        }
    }

    /// Waits for the tenant's in-flight connection attempt to connect.
    ///
    /// Bounded by the pairing timeout; fails at once when no attempt is running.
    pub async fn wait_connected(&self, tenant: &TenantId) -> Result<Session, HeraldError> {
        let slot = self.inner.slot(tenant);
        let mut progress = {
            let guard = slot.lock().await;
            match &guard.state {
                SlotState::Connected(session) => {
                    session.touch();
                    return Ok(session.clone());
                }
                SlotState::Pairing(progress) => progress.clone(),
                SlotState::Absent | SlotState::ReconnectPending => {
                    return Err(unavailable(tenant, "no connection attempt in progress"));
                }
            }
        };

        let seen = progress
            .wait_for(|p| matches!(p, Progress::Ready | Progress::Failed(_)))
            .await
            .map(|p| p.clone());
        match seen {
            Ok(Progress::Ready) => self.connected_session(tenant).await,
            Ok(Progress::Failed(failure)) => Err(failure.into_error(tenant)),
            _ => Err(unavailable(tenant, "connection attempt ended")),
        }
    }

    async fn connected_session(&self, tenant: &TenantId) -> Result<Session, HeraldError> {
        let slot = self.inner.slot(tenant);
        let guard = slot.lock().await;
        match &guard.state {
            SlotState::Connected(session) => {
                session.touch();
                Ok(session.clone())
            }
            _ => Err(unavailable(tenant, "session closed before it could be used")),
        }
    }

    async fn abandon(&self, tenant: &TenantId, generation: u64) {
        let slot = self.inner.slot(tenant);
        let mut guard = slot.lock().await;
        if guard.generation == generation && matches!(guard.state, SlotState::Pairing(_)) {
            warn!(tenant = %tenant, "no pairing progress within the window; attempt abandoned");
            close_quietly(tenant, guard.reset()).await;
        }
    }

    /// Logs the tenant out and purges its credentials. Idempotent.
    pub async fn disconnect(&self, tenant: &TenantId) -> Result<(), HeraldError> {
        let slot = self.inner.slot(tenant);
        let mut guard = slot.lock().await;
        let was_connected = matches!(guard.state, SlotState::Connected(_));
        if let Some(channel) = guard.reset() {
            let result = if was_connected {
                channel.logout().await
            } else {
                channel.close().await
            };
            if let Err(e) = result {
                warn!(tenant = %tenant, error = %e, "channel did not close cleanly");
            }
        }
        guard.reconnect_failures = 0;
        self.inner.store.purge(tenant).await?;
        info!(tenant = %tenant, "session disconnected and credentials purged");
        Ok(())
    }

    /// Cheap liveness check for reporting.
    pub async fn status(&self, tenant: &TenantId) -> SessionStatus {
        match self.state(tenant).await {
            PoolState::Connected => SessionStatus::Connected,
            _ => SessionStatus::Disconnected,
        }
    }

    pub async fn state(&self, tenant: &TenantId) -> PoolState {
        let Some(slot) = self.inner.slots.get(tenant).map(|e| Arc::clone(e.value())) else {
            return PoolState::Absent;
        };
        let guard = slot.lock().await;
        guard.pool_state()
    }

    /// Number of tenants with a connected session.
    pub async fn connected_count(&self) -> usize {
        let slots: Vec<_> = self.inner.slots.iter().map(|e| Arc::clone(e.value())).collect();
        let mut count = 0;
        for slot in slots {
            if matches!(slot.lock().await.state, SlotState::Connected(_)) {
                count += 1;
            }
        }
        count
    }

    /// Closes every channel and stops all background tasks. Credentials are kept.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let slots: Vec<_> = self
            .inner
            .slots
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        for (tenant, slot) in slots {
            let mut guard = slot.lock().await;
            close_quietly(&tenant, guard.reset()).await;
        }
        if let Err(e) = self.inner.connector.shutdown().await {
            warn!(error = %e, "connector shutdown failed");
        }
        info!("connection pool shut down");
    }
}

#[async_trait]
impl SessionProvider for ConnectionPool {
    async fn acquire_session(
        &self,
        tenant: &TenantId,
    ) -> Result<Arc<dyn DeliveryChannel>, HeraldError> {
        match self.acquire(tenant).await {
            Ok(Acquired::Ready(session)) => Ok(Arc::new(session)),
            Ok(Acquired::Challenge(_)) => Err(unavailable(
                tenant,
                "pairing required; connect the tenant before sending",
            )),
            Err(HeraldError::Timeout { duration }) => Err(unavailable(
                tenant,
                format!("no session after {}s", duration.as_secs()),
            )),
            Err(e) => Err(e),
        }
    }
}
