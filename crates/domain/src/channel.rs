//! Hardware channel identities and discovery records.
//!
//! A channel is addressed by the triple (controller serial, hub port, channel
//! index). The channel class is carried along for filtering and display but is
//! **not** part of identity — two events referring to the same physical slot
//! must match even when the driver reports a different class string.

use serde::{Deserialize, Serialize};

/// Functional class of a hardware channel as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelClass {
    DigitalOutput,
    VoltageOutput,
    DigitalInput,
    VoltageInput,
}

impl std::fmt::Display for ChannelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DigitalOutput => f.write_str("digital_output"),
            Self::VoltageOutput => f.write_str("voltage_output"),
            Self::DigitalInput => f.write_str("digital_input"),
            Self::VoltageInput => f.write_str("voltage_input"),
        }
    }
}

/// Identity of a physical channel slot.
///
/// Equality and hashing cover only the three numeric fields; `class` is
/// informational. Use [`matches`](Self::matches) when the intent is channel
/// resolution, it reads better at call sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelIdentity {
    /// Serial number of the controller the hub is plugged into.
    pub controller_serial: i32,
    /// Port on the hub.
    pub hub_port: i32,
    /// Channel index on the hub port.
    pub channel: i32,
    /// Reported channel class (not part of identity).
    pub class: ChannelClass,
}

impl ChannelIdentity {
    /// Whether `other` refers to the same physical channel slot.
    ///
    /// True iff channel index, hub port, and controller serial are pairwise
    /// equal.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.channel == other.channel
            && self.hub_port == other.hub_port
            && self.controller_serial == other.controller_serial
    }
}

impl PartialEq for ChannelIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for ChannelIdentity {}

impl std::hash::Hash for ChannelIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.controller_serial.hash(state);
        self.hub_port.hash(state);
        self.channel.hash(state);
    }
}

impl std::fmt::Display for ChannelIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "serial {} hub port {} channel {}",
            self.controller_serial, self.hub_port, self.channel
        )
    }
}

/// A channel reported attached by the hardware manager.
///
/// Exclusively owned by the device registry. Other components keep only the
/// [`ChannelIdentity`] and re-resolve it through the registry, so a detach
/// never leaves a dangling reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredChannel {
    pub identity: ChannelIdentity,
    pub device_name: String,
    pub channel_name: String,
}

/// Caller-supplied channel address, possibly without a controller serial.
///
/// API callers address channels by hub port and channel index; the serial is
/// optional because a single-controller installation never needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTarget {
    pub channel: i32,
    pub hub_port: i32,
    pub controller_serial: Option<i32>,
}

impl ChannelTarget {
    /// Whether this target selects the given identity.
    #[must_use]
    pub fn selects(&self, identity: &ChannelIdentity) -> bool {
        self.channel == identity.channel
            && self.hub_port == identity.hub_port
            && self
                .controller_serial
                .is_none_or(|serial| serial == identity.controller_serial)
    }
}
