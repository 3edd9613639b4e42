//! JSON REST handlers for named actuators.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hearth_app::actuators::ActuatorSnapshot;
use hearth_app::ports::{OutputDriver, SensorConnector};
use hearth_domain::actuator::{ActuatorKind, OutputLevel};
use hearth_domain::channel::ChannelTarget;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for driving (and implicitly creating) an actuator.
///
/// `channel` and `hub_port` are only needed the first time a name is used;
/// an existing actuator is addressed by name alone.
#[derive(Deserialize)]
pub struct SetActuatorRequest {
    pub name: String,
    pub kind: ActuatorKind,
    pub value: OutputLevel,
    pub channel: Option<i32>,
    pub hub_port: Option<i32>,
    pub controller_serial: Option<i32>,
}

impl SetActuatorRequest {
    fn target(&self) -> Option<ChannelTarget> {
        match (self.channel, self.hub_port) {
            (Some(channel), Some(hub_port)) => Some(ChannelTarget {
                channel,
                hub_port,
                controller_serial: self.controller_serial,
            }),
            _ => None,
        }
    }
}

/// Acknowledgement body for a successful set.
#[derive(Serialize)]
pub struct SetActuatorAck {
    pub name: String,
    pub value: OutputLevel,
}

/// Possible responses from the set endpoint.
pub enum SetResponse {
    Ok(Json<SetActuatorAck>),
}

impl IntoResponse for SetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the close endpoint.
pub enum CloseResponse {
    NoContent,
}

impl IntoResponse for CloseResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/actuators`
pub async fn list<D, SC>(State(state): State<AppState<D, SC>>) -> Json<Vec<ActuatorSnapshot>>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    Json(state.supervisor.snapshot())
}

/// `POST /api/actuators`
pub async fn set<D, SC>(
    State(state): State<AppState<D, SC>>,
    Json(req): Json<SetActuatorRequest>,
) -> Result<SetResponse, ApiError>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    state
        .supervisor
        .set_state(&req.name, req.target(), req.kind, req.value)
        .await?;
    Ok(SetResponse::Ok(Json(SetActuatorAck {
        name: req.name,
        value: req.value,
    })))
}

/// `DELETE /api/actuators/{name}`
pub async fn close<D, SC>(
    State(state): State<AppState<D, SC>>,
    Path(name): Path<String>,
) -> Result<CloseResponse, ApiError>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    state.supervisor.close(&name).await?;
    Ok(CloseResponse::NoContent)
}
