//! Sensor transport port — establishing telemetry subscriptions.

use std::future::Future;

use hearth_domain::error::HearthError;
use hearth_domain::id::SensorId;
use hearth_domain::sensor::BrokerEndpoint;

/// Opens transport connections for sensor topics and registers the resulting
/// subscriptions with the sensor hub.
///
/// Implemented by transport adapters (MQTT today); the HTTP layer only ever
/// sees this trait.
pub trait SensorConnector: Send + Sync {
    /// Subscribe to `topic` on the given broker and start ingesting messages.
    fn connect(
        &self,
        topic: &str,
        endpoint: BrokerEndpoint,
    ) -> impl Future<Output = Result<SensorId, HearthError>> + Send;
}
