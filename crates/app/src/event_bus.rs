//! Device event delivery backed by a tokio broadcast channel.
//!
//! The hardware driver publishes [`DeviceEvent`]s here from its own thread;
//! a pump task forwards them into the [`DeviceRegistry`]. Publishing is
//! non-blocking, which keeps the driver's latency-sensitive callback path
//! free of anything but the registry mutex.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use hearth_domain::event::DeviceEvent;

use crate::registry::DeviceRegistry;

/// In-process device event bus.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
#[derive(Clone)]
pub struct DeviceEventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl DeviceEventBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: DeviceEvent) {
        // send fails only when there are zero receivers, which is fine
        let _ = self.sender.send(event);
    }
}

/// Spawn the task that applies bus events to the registry.
///
/// A lagged receiver (the bus outran the pump) logs the number of dropped
/// events and keeps going; the task ends when every bus handle is dropped.
pub fn spawn_registry_pump(bus: &DeviceEventBus, registry: Arc<DeviceRegistry>) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => registry.handle_event(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "device event pump lagged, dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_domain::channel::{ChannelClass, ChannelIdentity, DiscoveredChannel};

    fn discovered(channel: i32) -> DiscoveredChannel {
        DiscoveredChannel {
            identity: ChannelIdentity {
                controller_serial: 620003,
                hub_port: 0,
                channel,
                class: ChannelClass::DigitalOutput,
            },
            device_name: "VINT Hub".to_string(),
            channel_name: format!("Digital Output {channel}"),
        }
    }

    fn registry() -> Arc<DeviceRegistry> {
        Arc::new(DeviceRegistry::new(vec![ChannelClass::DigitalOutput]))
    }

    async fn wait_for_attached(registry: &DeviceRegistry, count: usize) {
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while registry.snapshot().len() != count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("registry never reached expected size");
    }

    #[tokio::test]
    async fn should_apply_published_attach_to_registry() {
        let bus = DeviceEventBus::new(16);
        let registry = registry();
        let _pump = spawn_registry_pump(&bus, Arc::clone(&registry));

        bus.publish(DeviceEvent::Attached(discovered(0)));

        wait_for_attached(&registry, 1).await;
    }

    #[tokio::test]
    async fn should_apply_attach_then_detach_in_order() {
        let bus = DeviceEventBus::new(16);
        let registry = registry();
        let _pump = spawn_registry_pump(&bus, Arc::clone(&registry));

        let channel = discovered(0);
        let identity = channel.identity;
        bus.publish(DeviceEvent::Attached(channel));
        bus.publish(DeviceEvent::Attached(discovered(1)));
        bus.publish(DeviceEvent::Detached(identity));

        wait_for_attached(&registry, 1).await;
        assert_eq!(registry.snapshot()[0].channel.identity.channel, 1);
    }

    #[tokio::test]
    async fn should_not_panic_when_publishing_without_subscribers() {
        let bus = DeviceEventBus::new(16);
        bus.publish(DeviceEvent::Attached(discovered(0)));
    }

    #[tokio::test]
    async fn should_stop_pump_when_bus_is_dropped() {
        let bus = DeviceEventBus::new(16);
        let registry = registry();
        let pump = spawn_registry_pump(&bus, Arc::clone(&registry));

        drop(bus);

        tokio::time::timeout(std::time::Duration::from_secs(1), pump)
            .await
            .expect("pump did not stop")
            .unwrap();
    }
}
