//! Sensor readings and the dewpoint augmentation rule.

use serde::{Deserialize, Serialize};

/// A decoded sensor reading — a flat JSON object of measurement fields.
pub type Reading = serde_json::Map<String, serde_json::Value>;

/// The closed set of sensor transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Mqtt,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mqtt => f.write_str("mqtt"),
        }
    }
}

/// Network location of an MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Inject a derived `dewpoint` field into a reading.
///
/// Applies only when `temperature` and `humidity` are present, `dewpoint` is
/// absent, and humidity exceeds 50%. The approximation
/// `dewpoint = temperature - (100 - humidity) / 5` is deliberately kept over
/// the Magnus formula — downstream thermostat consumers were calibrated
/// against it.
pub fn augment_dewpoint(reading: &mut Reading) {
    if reading.contains_key("dewpoint") {
        return;
    }
    let temperature = reading.get("temperature").and_then(serde_json::Value::as_f64);
    let humidity = reading.get("humidity").and_then(serde_json::Value::as_f64);
    let (Some(temperature), Some(humidity)) = (temperature, humidity) else {
        return;
    };
    if humidity > 50.0 {
        let dewpoint = temperature - (100.0 - humidity) / 5.0;
        reading.insert("dewpoint".to_string(), serde_json::Value::from(dewpoint));
    }
}
