//! JSON REST handler for the persisted state document.

use axum::Json;
use axum::extract::State;

use hearth_app::ports::{OutputDriver, SensorConnector};
use hearth_domain::document::StateDocument;

use crate::state::AppState;

/// `GET /api/state`
pub async fn get<D, SC>(State(state): State<AppState<D, SC>>) -> Json<StateDocument>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    Json(state.document.as_ref().clone())
}
