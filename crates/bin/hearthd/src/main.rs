//! # hearthd — hearth daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Construct the device registry, event bus, and registry pump
//! - Construct the actuator supervisor over the hardware driver
//! - Construct the sensor hub and MQTT connector
//! - Load the state document and restore persisted actuators/sensors
//! - Build the axum router, bind, and serve
//! - On shutdown: snapshot live state, drain actuators and sensors, save the
//!   document
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use hearth_adapter_http_axum::state::AppState;
use hearth_adapter_mqtt::MqttConnector;
use hearth_adapter_virtual::{VirtualHub, demo_channels};
use hearth_app::actuators::{ActuatorSnapshot, ActuatorSupervisor};
use hearth_app::event_bus::{DeviceEventBus, spawn_registry_pump};
use hearth_app::ports::SensorConnector;
use hearth_app::registry::DeviceRegistry;
use hearth_app::sensors::{SensorHub, SensorInfo};
use hearth_domain::channel::{ChannelClass, ChannelTarget};
use hearth_domain::document::{ActuatorRecord, SensorRecord, StateDocument};
use hearth_domain::sensor::BrokerEndpoint;

use config::Config;
use store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Core: registry fed by the device event bus
    let bus = DeviceEventBus::new(256);
    let registry = Arc::new(DeviceRegistry::new(vec![
        ChannelClass::DigitalOutput,
        ChannelClass::VoltageOutput,
    ]));
    let _pump = spawn_registry_pump(&bus, Arc::clone(&registry));

    // Hardware driver
    let hub = VirtualHub::new(bus.clone());
    if config.driver.virtual_enabled {
        for channel in demo_channels() {
            hub.attach(channel);
        }
    }

    // Actuators & sensors
    let supervisor = Arc::new(ActuatorSupervisor::new(
        Arc::clone(&registry),
        hub.clone(),
        Duration::from_secs(config.driver.open_timeout_secs),
    ));
    let sensors = Arc::new(SensorHub::new());
    let connector = Arc::new(MqttConnector::new(
        Arc::clone(&sensors),
        config.mqtt.clone(),
    ));

    // Persisted state
    let doc_store = Store::new(&config.store.path);
    let document = doc_store.load()?;
    restore(&document, &supervisor, connector.as_ref()).await;
    let document = Arc::new(document);

    // HTTP
    let state = AppState::new(
        Arc::clone(&registry),
        Arc::clone(&supervisor),
        Arc::clone(&sensors),
        Arc::clone(&connector),
        Arc::clone(&document),
    );
    let app = hearth_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "hearthd listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Snapshot before draining so the document reflects what was live
    let saved = rebuild_document(&document, &supervisor.snapshot(), &sensors.list());
    supervisor.drain().await;
    sensors.stop_all();
    doc_store.save(&saved)?;
    tracing::info!("hearthd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

/// Re-open persisted actuators and re-establish persisted sensor
/// subscriptions. Individual failures are logged and skipped — a channel that
/// is no longer attached must not prevent startup.
async fn restore<D, SC>(
    document: &StateDocument,
    supervisor: &ActuatorSupervisor<D>,
    connector: &SC,
) where
    D: hearth_app::ports::OutputDriver,
    SC: SensorConnector,
{
    for record in &document.actuators {
        let target = ChannelTarget {
            channel: record.channel,
            hub_port: record.hub_port,
            controller_serial: record.controller_serial,
        };
        match supervisor.open(&record.name, target, record.kind).await {
            Ok(()) => tracing::info!(actuator = %record.name, "restored actuator"),
            Err(err) => {
                tracing::warn!(actuator = %record.name, error = %err, "failed to restore actuator");
            }
        }
    }

    for record in &document.sensors {
        let endpoint = BrokerEndpoint {
            host: record.broker.clone(),
            port: record.port,
        };
        match connector.connect(&record.topic, endpoint).await {
            Ok(id) => tracing::info!(topic = %record.topic, sensor = %id, "restored sensor"),
            Err(err) => {
                tracing::warn!(topic = %record.topic, error = %err, "failed to restore sensor");
            }
        }
    }
}

/// Build the document to persist: thermostats pass through unchanged, the
/// actuator and sensor sections mirror what is currently live.
fn rebuild_document(
    previous: &StateDocument,
    actuators: &[ActuatorSnapshot],
    sensors: &[SensorInfo],
) -> StateDocument {
    StateDocument {
        thermostats: previous.thermostats.clone(),
        actuators: actuators
            .iter()
            .map(|snapshot| ActuatorRecord {
                name: snapshot.name.clone(),
                channel: snapshot.identity.channel,
                hub_port: snapshot.identity.hub_port,
                controller_serial: Some(snapshot.identity.controller_serial),
                kind: snapshot.kind,
            })
            .collect(),
        sensors: sensors
            .iter()
            .map(|info| SensorRecord {
                topic: info.topic.clone(),
                broker: info.broker.host.clone(),
                port: info.broker.port,
            })
            .collect(),
    }
}
