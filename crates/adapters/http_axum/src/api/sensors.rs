//! JSON REST handlers for sensor subscriptions.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hearth_app::ports::{OutputDriver, SensorConnector};
use hearth_app::sensors::SensorInfo;
use hearth_domain::id::SensorId;
use hearth_domain::sensor::BrokerEndpoint;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for registering a sensor.
#[derive(Deserialize)]
pub struct RegisterSensorRequest {
    pub topic: String,
    pub broker: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    1883
}

/// Response body for a successful registration.
#[derive(Serialize)]
pub struct RegisterSensorResponse {
    pub id: SensorId,
}

/// Possible responses from the register endpoint.
pub enum RegisterResponse {
    Created(Json<RegisterSensorResponse>),
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `GET /api/sensors`
pub async fn list<D, SC>(State(state): State<AppState<D, SC>>) -> Json<Vec<SensorInfo>>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    Json(state.sensors.list())
}

/// `POST /api/sensors`
pub async fn register<D, SC>(
    State(state): State<AppState<D, SC>>,
    Json(req): Json<RegisterSensorRequest>,
) -> Result<RegisterResponse, ApiError>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    let endpoint = BrokerEndpoint {
        host: req.broker,
        port: req.port,
    };
    let id = state.connector.connect(&req.topic, endpoint).await?;
    Ok(RegisterResponse::Created(Json(RegisterSensorResponse {
        id,
    })))
}
