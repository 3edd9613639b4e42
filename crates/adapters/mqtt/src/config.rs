//! MQTT connector configuration.

use serde::Deserialize;

/// Settings applied to every broker connection the connector opens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// Client id prefix; the sensor id is appended so each subscription gets
    /// a unique session on the broker.
    pub client_id: String,
    /// Optional broker credentials.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval, in seconds.
    pub keep_alive_secs: u16,
    /// Delay before re-polling after a connection error, in seconds.
    pub reconnect_delay_secs: u16,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            client_id: "hearth".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            reconnect_delay_secs: 5,
        }
    }
}
