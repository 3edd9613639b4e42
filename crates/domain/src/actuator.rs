//! Actuator kinds and output levels.

use serde::{Deserialize, Serialize};

use crate::channel::ChannelClass;
use crate::error::ValidationError;

/// Lowest voltage a voltage-output channel accepts.
pub const VOLTAGE_MIN: f64 = -10.0;
/// Highest voltage a voltage-output channel accepts.
pub const VOLTAGE_MAX: f64 = 10.0;

/// The closed set of actuator types the controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorKind {
    DigitalOutput,
    VoltageOutput,
}

impl ActuatorKind {
    /// The channel class an actuator of this kind binds to.
    #[must_use]
    pub fn channel_class(self) -> ChannelClass {
        match self {
            Self::DigitalOutput => ChannelClass::DigitalOutput,
            Self::VoltageOutput => ChannelClass::VoltageOutput,
        }
    }
}

impl std::fmt::Display for ActuatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DigitalOutput => f.write_str("digital_output"),
            Self::VoltageOutput => f.write_str("voltage_output"),
        }
    }
}

/// Target level for an output channel.
///
/// Serialized untagged so API callers send plain `true` / `false` for digital
/// outputs and a bare number for voltage outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputLevel {
    Digital(bool),
    Voltage(f64),
}

impl OutputLevel {
    /// Validate this level against the actuator kind it is destined for.
    ///
    /// Performed before any driver interaction: a digital output only accepts
    /// booleans, a voltage output only accepts finite values within
    /// [`VOLTAGE_MIN`]..=[`VOLTAGE_MAX`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::LevelKindMismatch`] when the value type does
    /// not fit the kind, or [`ValidationError::VoltageOutOfRange`] when a
    /// voltage is out of bounds or not finite.
    pub fn validate_for(self, kind: ActuatorKind) -> Result<(), ValidationError> {
        match (self, kind) {
            (Self::Digital(_), ActuatorKind::DigitalOutput) => Ok(()),
            (Self::Voltage(value), ActuatorKind::VoltageOutput) => {
                if value.is_finite() && (VOLTAGE_MIN..=VOLTAGE_MAX).contains(&value) {
                    Ok(())
                } else {
                    Err(ValidationError::VoltageOutOfRange { value })
                }
            }
            (_, kind) => Err(ValidationError::LevelKindMismatch { kind }),
        }
    }
}

impl std::fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digital(state) => write!(f, "{state}"),
            Self::Voltage(value) => write!(f, "{value}V"),
        }
    }
}
