//! # hearth-app
//!
//! Application layer — the concurrent core plus **port definitions** (traits).
//!
//! ## Responsibilities
//! - [`registry`] — the device registry: which channels are attached, which
//!   are claimed, all behind one mutex
//! - [`event_bus`] — delivery of attach/detach/fault events from the hardware
//!   manager's background thread into the registry
//! - [`actuators`] — actuator lifecycle: claim a channel, open a driver
//!   connection with a bounded wait, apply levels, release on teardown
//! - [`sensors`] — sensor subscriptions: dewpoint augmentation and ordered
//!   fan-out to subscriber callbacks
//! - [`ports`] — traits adapters must implement (`OutputDriver`,
//!   `OutputConnection`, `SensorConnector`)
//!
//! ## Dependency rule
//! Depends on `hearth-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod actuators;
pub mod event_bus;
pub mod ports;
pub mod registry;
pub mod sensors;
