//! Device registry — the shared record of attached and claimed channels.
//!
//! One mutex guards both sets. Every operation acquires it, performs only
//! in-memory work, and releases it before returning; driver I/O never happens
//! under this lock. The attach/detach side is called from the hardware
//! manager's background thread, the claim/release/snapshot side from request
//! handlers — the mutex is the only thing they share.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use hearth_domain::channel::{ChannelClass, ChannelIdentity, ChannelTarget, DiscoveredChannel};
use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::event::DeviceEvent;

/// One attached channel as seen by view code.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    #[serde(flatten)]
    pub channel: DiscoveredChannel,
    pub in_use: bool,
}

#[derive(Default)]
struct RegistryState {
    attached: Vec<DiscoveredChannel>,
    in_use: Vec<ChannelIdentity>,
}

/// Registry of discovered channels and the subset claimed by live actuators.
///
/// Constructed once at startup and shared via `Arc` with every consumer —
/// never process-global state.
///
/// Invariant: `in_use` only ever contains identities currently present in
/// `attached`; a detach clears both.
pub struct DeviceRegistry {
    supported: Vec<ChannelClass>,
    state: Mutex<RegistryState>,
}

impl DeviceRegistry {
    /// Create a registry accepting attach events for the given channel
    /// classes.
    #[must_use]
    pub fn new(supported: Vec<ChannelClass>) -> Self {
        Self {
            supported,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Lock the registry state.
    ///
    /// A panicking caller cannot corrupt the in-memory sets (every mutation
    /// is a single `Vec` operation), so a poisoned lock is recovered rather
    /// than propagated.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a device event from the hardware manager.
    ///
    /// Runs on the driver's callback thread: nothing here blocks on anything
    /// but the registry mutex. Faults are logged and deliberately do not touch
    /// registry state — device-level errors are not lifecycle events.
    pub fn handle_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Attached(channel) => self.attach(channel),
            DeviceEvent::Detached(identity) => self.detach(&identity),
            DeviceEvent::Fault {
                identity,
                code,
                description,
            } => {
                tracing::warn!(%identity, code, description, "device fault reported");
            }
        }
    }

    /// Record a channel as attached.
    ///
    /// Channels of unsupported classes are ignored. The hardware layer does
    /// not guarantee attach idempotency, so a repeated attach for an identity
    /// already present refreshes that entry instead of duplicating it.
    pub fn attach(&self, channel: DiscoveredChannel) {
        if !self.supported.contains(&channel.identity.class) {
            tracing::debug!(
                identity = %channel.identity,
                class = %channel.identity.class,
                "ignoring attach for unsupported channel class"
            );
            return;
        }

        let mut state = self.lock();
        if let Some(existing) = state
            .attached
            .iter_mut()
            .find(|existing| existing.identity.matches(&channel.identity))
        {
            tracing::debug!(identity = %channel.identity, "duplicate attach, refreshing entry");
            *existing = channel;
        } else {
            tracing::info!(
                identity = %channel.identity,
                device = %channel.device_name,
                "channel attached"
            );
            state.attached.push(channel);
        }
    }

    /// Remove a channel from the attached set.
    ///
    /// Also removes it from the in-use set when claimed, so `in_use` stays a
    /// subset of `attached`. Detaching an unknown identity is a no-op.
    pub fn detach(&self, identity: &ChannelIdentity) {
        let mut state = self.lock();
        let before = state.attached.len();
        state
            .attached
            .retain(|channel| !channel.identity.matches(identity));
        if state.attached.len() == before {
            tracing::debug!(%identity, "detach for unknown channel, ignoring");
            return;
        }
        state.in_use.retain(|claimed| !claimed.matches(identity));
        tracing::info!(%identity, "channel detached");
    }

    /// A deep copy of the attached set with a per-entry in-use flag.
    ///
    /// Safe to call concurrently with attach/detach; callers never observe a
    /// partial mutation.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        let state = self.lock();
        state
            .attached
            .iter()
            .map(|channel| ChannelSnapshot {
                channel: channel.clone(),
                in_use: state
                    .in_use
                    .iter()
                    .any(|claimed| claimed.matches(&channel.identity)),
            })
            .collect()
    }

    /// Claim the attached channel with the given identity.
    ///
    /// # Errors
    ///
    /// [`HearthError::NotFound`] when no attached channel matches,
    /// [`HearthError::AlreadyInUse`] when another actuator holds it.
    pub fn claim(&self, identity: &ChannelIdentity) -> Result<DiscoveredChannel, HearthError> {
        self.claim_where(
            |channel| channel.identity.matches(identity),
            || identity.to_string(),
        )
    }

    /// Resolve a caller-supplied target to an attached channel and claim it.
    ///
    /// Resolution and claim happen under one lock acquisition, so two callers
    /// racing for the same target cannot both succeed.
    ///
    /// # Errors
    ///
    /// Same as [`claim`](Self::claim).
    pub fn claim_target(&self, target: &ChannelTarget) -> Result<DiscoveredChannel, HearthError> {
        self.claim_where(
            |channel| target.selects(&channel.identity),
            || format!("hub port {} channel {}", target.hub_port, target.channel),
        )
    }

    fn claim_where(
        &self,
        select: impl Fn(&DiscoveredChannel) -> bool,
        describe: impl FnOnce() -> String,
    ) -> Result<DiscoveredChannel, HearthError> {
        let mut state = self.lock();
        let Some(channel) = state.attached.iter().find(|channel| select(channel)).cloned() else {
            return Err(NotFoundError {
                entity: "Channel",
                id: describe(),
            }
            .into());
        };
        if state
            .in_use
            .iter()
            .any(|claimed| claimed.matches(&channel.identity))
        {
            return Err(HearthError::AlreadyInUse(channel.identity));
        }
        state.in_use.push(channel.identity);
        tracing::debug!(identity = %channel.identity, "channel claimed");
        Ok(channel)
    }

    /// Release a claimed identity. Idempotent: releasing an identity that is
    /// not in use (or no longer attached) does nothing.
    pub fn release(&self, identity: &ChannelIdentity) {
        let mut state = self.lock();
        let before = state.in_use.len();
        state.in_use.retain(|claimed| !claimed.matches(identity));
        if state.in_use.len() < before {
            tracing::debug!(%identity, "channel released");
        }
    }
}
