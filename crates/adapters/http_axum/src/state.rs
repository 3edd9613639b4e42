//! Shared application state for axum handlers.

use std::sync::Arc;

use hearth_app::actuators::ActuatorSupervisor;
use hearth_app::ports::{OutputDriver, SensorConnector};
use hearth_app::registry::DeviceRegistry;
use hearth_app::sensors::SensorHub;
use hearth_domain::document::StateDocument;

/// Application state shared across all axum handlers.
///
/// Generic over the output driver and sensor connector to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<D: OutputDriver, SC> {
    /// Attached-channel registry.
    pub registry: Arc<DeviceRegistry>,
    /// Named actuator lifecycle manager.
    pub supervisor: Arc<ActuatorSupervisor<D>>,
    /// Sensor subscription registry.
    pub sensors: Arc<SensorHub>,
    /// Transport connector for new sensor registrations.
    pub connector: Arc<SC>,
    /// The state document loaded at startup.
    pub document: Arc<StateDocument>,
}

impl<D: OutputDriver, SC> Clone for AppState<D, SC> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            supervisor: Arc::clone(&self.supervisor),
            sensors: Arc::clone(&self.sensors),
            connector: Arc::clone(&self.connector),
            document: Arc::clone(&self.document),
        }
    }
}

impl<D, SC> AppState<D, SC>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    /// Create a new application state from pre-wrapped `Arc` components.
    ///
    /// The components are shared with background tasks (event pump, sensor
    /// loops), so they arrive already `Arc`-ed.
    pub fn new(
        registry: Arc<DeviceRegistry>,
        supervisor: Arc<ActuatorSupervisor<D>>,
        sensors: Arc<SensorHub>,
        connector: Arc<SC>,
        document: Arc<StateDocument>,
    ) -> Self {
        Self {
            registry,
            supervisor,
            sensors,
            connector,
            document,
        }
    }
}
