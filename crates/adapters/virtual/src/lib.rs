//! # hearth-adapter-virtual
//!
//! Virtual hardware hub — a simulated [`OutputDriver`] for demos and
//! integration tests. Channels are attached and detached programmatically;
//! each transition publishes the corresponding [`DeviceEvent`] on the bus,
//! exactly like a real hardware manager's background thread would.
//!
//! ## Dependency rule
//!
//! Depends on `hearth-app` (port traits + event bus) and `hearth-domain` only.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use hearth_app::event_bus::DeviceEventBus;
use hearth_app::ports::{OutputConnection, OutputDriver};
use hearth_domain::actuator::{ActuatorKind, OutputLevel};
use hearth_domain::channel::{ChannelClass, ChannelIdentity, DiscoveredChannel};
use hearth_domain::error::DriverError;
use hearth_domain::event::DeviceEvent;

/// Serial number reported by the simulated controller.
pub const DEMO_CONTROLLER_SERIAL: i32 = 620003;

struct Plant {
    live: Mutex<Vec<DiscoveredChannel>>,
    applied: Mutex<Vec<(ChannelIdentity, OutputLevel)>>,
    changed: Notify,
}

impl Plant {
    fn lock_live(&self) -> MutexGuard<'_, Vec<DiscoveredChannel>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, identity: &ChannelIdentity) -> bool {
        self.lock_live()
            .iter()
            .any(|channel| channel.identity.matches(identity))
    }
}

/// Simulated hardware hub.
///
/// Cheap to clone; all clones share the same simulated plant and publish to
/// the same event bus.
#[derive(Clone)]
pub struct VirtualHub {
    bus: DeviceEventBus,
    plant: Arc<Plant>,
}

impl VirtualHub {
    /// Create a hub with no channels attached.
    #[must_use]
    pub fn new(bus: DeviceEventBus) -> Self {
        Self {
            bus,
            plant: Arc::new(Plant {
                live: Mutex::new(Vec::new()),
                applied: Mutex::new(Vec::new()),
                changed: Notify::new(),
            }),
        }
    }

    /// Simulate a physical attach: the channel becomes openable and an
    /// `Attached` event goes out on the bus.
    pub fn attach(&self, channel: DiscoveredChannel) {
        {
            let mut live = self.plant.lock_live();
            live.retain(|existing| !existing.identity.matches(&channel.identity));
            live.push(channel.clone());
        }
        self.plant.changed.notify_waiters();
        self.bus.publish(DeviceEvent::Attached(channel));
    }

    /// Simulate a physical detach: pending and future opens fail, live
    /// connections start reporting `NotAttached`, and a `Detached` event goes
    /// out on the bus.
    pub fn detach(&self, identity: ChannelIdentity) {
        self.plant
            .lock_live()
            .retain(|channel| !channel.identity.matches(&identity));
        self.plant.changed.notify_waiters();
        self.bus.publish(DeviceEvent::Detached(identity));
    }

    /// Simulate a device-level fault report.
    pub fn fault(&self, identity: ChannelIdentity, code: i32, description: impl Into<String>) {
        self.bus.publish(DeviceEvent::Fault {
            identity,
            code,
            description: description.into(),
        });
    }

    /// The last level applied to the given channel, if any.
    #[must_use]
    pub fn applied(&self, identity: &ChannelIdentity) -> Option<OutputLevel> {
        self.plant
            .applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(applied_to, _)| applied_to.matches(identity))
            .map(|(_, level)| *level)
    }
}

impl OutputDriver for VirtualHub {
    type Connection = VirtualConnection;

    async fn open(
        &self,
        identity: ChannelIdentity,
        _kind: ActuatorKind,
        wait: Duration,
    ) -> Result<VirtualConnection, DriverError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let changed = self.plant.changed.notified();
            if self.plant.is_live(&identity) {
                tracing::debug!(%identity, "virtual channel opened");
                return Ok(VirtualConnection {
                    plant: Arc::clone(&self.plant),
                    identity,
                    closed: false,
                });
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(DriverError::OpenTimeout(wait));
            }
            if tokio::time::timeout(deadline - now, changed).await.is_err() {
                return Err(DriverError::OpenTimeout(wait));
            }
        }
    }
}

/// Live connection to one simulated channel.
pub struct VirtualConnection {
    plant: Arc<Plant>,
    identity: ChannelIdentity,
    closed: bool,
}

impl OutputConnection for VirtualConnection {
    async fn apply(&mut self, level: OutputLevel) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        if !self.plant.is_live(&self.identity) {
            return Err(DriverError::NotAttached);
        }
        self.plant
            .applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((self.identity, level));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.closed = true;
        Ok(())
    }
}

/// The channel set a demo hub boots with: two digital outputs and one
/// voltage output on hub port 0.
#[must_use]
pub fn demo_channels() -> Vec<DiscoveredChannel> {
    let channel = |index: i32, class: ChannelClass, name: &str| DiscoveredChannel {
        identity: ChannelIdentity {
            controller_serial: DEMO_CONTROLLER_SERIAL,
            hub_port: 0,
            channel: index,
            class,
        },
        device_name: "Virtual VINT Hub".to_string(),
        channel_name: name.to_string(),
    };
    vec![
        channel(0, ChannelClass::DigitalOutput, "Digital Output 0"),
        channel(1, ChannelClass::DigitalOutput, "Digital Output 1"),
        channel(2, ChannelClass::VoltageOutput, "Voltage Output 2"),
    ]
}
