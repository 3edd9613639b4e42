//! # hearth-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a REST JSON API over the core: attached channels, named
//!   actuators, sensor subscriptions, and the persisted state document
//! - Map HTTP requests into registry/supervisor/hub calls (driving adapter)
//! - Map [`HearthError`](hearth_domain::error::HearthError) values onto
//!   HTTP status codes
//!
//! ## Dependency rule
//! Depends on `hearth-app` (for port traits and the core) and
//! `hearth-domain` (for types used in request/response mapping). Never leaks
//! axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
