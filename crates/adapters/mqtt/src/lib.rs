//! # hearth-adapter-mqtt
//!
//! MQTT adapter — bridges broker telemetry into the sensor hub.
//!
//! ## Responsibilities
//! - Open one `rumqttc` client per registered sensor
//! - Subscribe to the sensor's topic on every (re)connect
//! - Feed publish payloads into [`SensorSubscription::ingest`]
//! - Tear the connection down when the subscription is stopped
//!
//! ## Dependency rule
//! Depends on `hearth-app` (port traits + sensor hub) and `hearth-domain`
//! only.

mod config;

pub use config::MqttSettings;

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use hearth_app::ports::SensorConnector;
use hearth_app::sensors::{SensorHub, SensorSubscription};
use hearth_domain::error::{HearthError, ValidationError};
use hearth_domain::id::SensorId;
use hearth_domain::sensor::{BrokerEndpoint, SensorKind};

/// [`SensorConnector`] backed by one `rumqttc` client per subscription.
pub struct MqttConnector {
    hub: Arc<SensorHub>,
    settings: MqttSettings,
}

impl MqttConnector {
    /// Create a connector registering subscriptions with the given hub.
    #[must_use]
    pub fn new(hub: Arc<SensorHub>, settings: MqttSettings) -> Self {
        Self { hub, settings }
    }

    fn broker_options(&self, id: SensorId, endpoint: &BrokerEndpoint) -> MqttOptions {
        let mut options = MqttOptions::new(
            format!("{}-{id}", self.settings.client_id),
            endpoint.host.clone(),
            endpoint.port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(self.settings.keep_alive_secs)));
        if let (Some(username), Some(password)) =
            (&self.settings.username, &self.settings.password)
        {
            options.set_credentials(username.clone(), password.clone());
        }
        options
    }
}

impl SensorConnector for MqttConnector {
    async fn connect(
        &self,
        topic: &str,
        endpoint: BrokerEndpoint,
    ) -> Result<SensorId, HearthError> {
        if topic.is_empty() || endpoint.host.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let subscription = self.hub.register(SensorKind::Mqtt, topic, endpoint.clone());
        let options = self.broker_options(subscription.id(), &endpoint);
        let (client, event_loop) = AsyncClient::new(options, 64);
        let reconnect_delay = Duration::from_secs(u64::from(self.settings.reconnect_delay_secs));

        tokio::spawn(run_subscription(
            client,
            event_loop,
            Arc::clone(&subscription),
            reconnect_delay,
        ));

        Ok(subscription.id())
    }
}

/// Poll the broker connection until the subscription is stopped.
///
/// The topic is (re)subscribed on every `ConnAck`, so a broker reconnect
/// transparently restores delivery. Connection errors back off and retry —
/// a sensor is not unregistered just because its broker went away.
async fn run_subscription(
    client: AsyncClient,
    mut event_loop: EventLoop,
    subscription: Arc<SensorSubscription>,
    reconnect_delay: Duration,
) {
    let topic = subscription.topic().to_string();
    loop {
        tokio::select! {
            () = subscription.stopped() => {
                let _ = client.disconnect().await;
                break;
            }
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!(sensor = %subscription.id(), %topic, "connected, subscribing");
                    if let Err(err) = client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                        tracing::warn!(%topic, error = %err, "subscribe request failed");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    tracing::debug!(topic = %publish.topic, bytes = publish.payload.len(), "message received");
                    subscription.ingest(&publish.payload);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        sensor = %subscription.id(),
                        %topic,
                        error = %err,
                        "mqtt connection error, retrying"
                    );
                    tokio::time::sleep(reconnect_delay).await;
                }
            }
        }
    }
    tracing::debug!(sensor = %subscription.id(), %topic, "mqtt loop ended");
}
