//! Device lifecycle events delivered by the hardware manager.

use crate::channel::{ChannelIdentity, DiscoveredChannel};

/// The closed set of events the hardware manager's background thread can
/// deliver.
///
/// Attach and detach are lifecycle events that mutate the device registry.
/// A fault is informational only — device-level errors never add or remove
/// registry entries.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A supported channel became physically available.
    Attached(DiscoveredChannel),
    /// A previously attached channel went away.
    Detached(ChannelIdentity),
    /// The driver reported a device-level fault.
    Fault {
        identity: ChannelIdentity,
        code: i32,
        description: String,
    },
}

impl DeviceEvent {
    /// The channel identity this event refers to.
    #[must_use]
    pub fn identity(&self) -> &ChannelIdentity {
        match self {
            Self::Attached(channel) => &channel.identity,
            Self::Detached(identity) | Self::Fault { identity, .. } => identity,
        }
    }
}
