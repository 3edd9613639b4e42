//! Common error types used across the workspace.
//!
//! Each layer defines typed errors and converts into [`HearthError`] via
//! `#[from]` — no `String` catch-all variants, no indiscriminate catching.

use std::time::Duration;

use crate::actuator::ActuatorKind;
use crate::channel::ChannelIdentity;

/// Top-level error returned by the application core.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    /// Bad input shape or range, rejected before any hardware interaction.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// Unknown name or identity.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The channel is already claimed by a live actuator.
    #[error("channel ({0}) is already in use")]
    AlreadyInUse(ChannelIdentity),

    /// Hardware or transport fault, surfaced after any claim was rolled back.
    #[error("driver error")]
    Driver(#[from] DriverError),
}

/// Input validation failures.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A name field was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// An unknown actuator name was given without a channel/hub-port target.
    #[error("unknown actuator name and no channel/hub port supplied")]
    MissingTarget,

    /// A voltage level outside the supported output range.
    #[error("voltage {value} is outside [{min}, {max}]", min = crate::actuator::VOLTAGE_MIN, max = crate::actuator::VOLTAGE_MAX)]
    VoltageOutOfRange {
        /// The rejected value.
        value: f64,
    },

    /// The level's value type does not fit the actuator kind.
    #[error("{kind} does not accept this value type")]
    LevelKindMismatch {
        /// The actuator kind the level was destined for.
        kind: ActuatorKind,
    },

    /// The resolved channel's class does not match the requested actuator
    /// kind.
    #[error("channel class {class} cannot back a {kind} actuator")]
    ChannelKindMismatch {
        /// Class of the resolved channel.
        class: crate::channel::ChannelClass,
        /// The actuator kind requested by the caller.
        kind: ActuatorKind,
    },
}

/// A lookup by name or identity found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// What was looked up (e.g. `"Channel"`, `"Actuator"`).
    pub entity: &'static str,
    /// The name or identity that missed.
    pub id: String,
}

/// Faults reported by the hardware driver or its transport.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The bounded wait for physical attachment elapsed.
    #[error("timed out after {0:?} waiting for channel attachment")]
    OpenTimeout(Duration),

    /// The channel detached while a connection was still open.
    #[error("channel is not attached")]
    NotAttached,

    /// The connection was already closed.
    #[error("connection already closed")]
    Closed,

    /// A device-level fault with a driver-specific code.
    #[error("driver fault {code}: {message}")]
    Fault {
        /// Driver-specific fault code.
        code: i32,
        /// Human-readable description from the driver.
        message: String,
    },
}
