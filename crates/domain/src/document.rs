//! State document records exchanged with the persistence collaborator.
//!
//! The on-disk state is a JSON document with top-level keys `thermostats`,
//! `actuators`, and `sensors`. The core only ever sees these typed records;
//! reading and writing the file is the composition root's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actuator::ActuatorKind;

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDocument {
    /// Thermostat display records, keyed by thermostat id.
    pub thermostats: BTreeMap<String, ThermostatRecord>,
    /// Actuators to re-open at startup.
    pub actuators: Vec<ActuatorRecord>,
    /// Sensor subscriptions to re-establish at startup.
    pub sensors: Vec<SensorRecord>,
}

/// Operating mode of a thermostat record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermostatMode {
    Heating,
    Cooling,
    #[default]
    Off,
}

/// A thermostat as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatRecord {
    pub name: String,
    pub temperature: f64,
    pub humidity: f64,
    pub setpoint: f64,
    pub mode: ThermostatMode,
}

/// A named actuator binding persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorRecord {
    pub name: String,
    pub channel: i32,
    pub hub_port: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_serial: Option<i32>,
    pub kind: ActuatorKind,
}

/// A sensor subscription persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub topic: String,
    pub broker: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
}

fn default_mqtt_port() -> u16 {
    1883
}
