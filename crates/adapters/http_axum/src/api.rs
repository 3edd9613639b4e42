//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod actuators;
#[allow(clippy::missing_errors_doc)]
pub mod channels;
#[allow(clippy::missing_errors_doc)]
pub mod document;
#[allow(clippy::missing_errors_doc)]
pub mod sensors;

use axum::Router;
use axum::routing::{delete, get};

use hearth_app::ports::{OutputDriver, SensorConnector};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<D, SC>() -> Router<AppState<D, SC>>
where
    D: OutputDriver + 'static,
    SC: SensorConnector + 'static,
{
    Router::new()
        .route("/channels", get(channels::list::<D, SC>))
        .route(
            "/actuators",
            get(actuators::list::<D, SC>).post(actuators::set::<D, SC>),
        )
        .route("/actuators/{name}", delete(actuators::close::<D, SC>))
        .route(
            "/sensors",
            get(sensors::list::<D, SC>).post(sensors::register::<D, SC>),
        )
        .route("/state", get(document::get::<D, SC>))
}
