//! JSON REST handlers for attached channels.

use axum::Json;
use axum::extract::State;

use hearth_app::ports::{OutputDriver, SensorConnector};
use hearth_app::registry::ChannelSnapshot;

use crate::state::AppState;

/// `GET /api/channels`
pub async fn list<D, SC>(State(state): State<AppState<D, SC>>) -> Json<Vec<ChannelSnapshot>>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    Json(state.registry.snapshot())
}
