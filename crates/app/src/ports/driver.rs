//! Hardware driver port — opening and driving output channels.
//!
//! The hardware SDK is an opaque collaborator behind these two traits. Both
//! open and close may block for real I/O; the supervisor guarantees they are
//! never called while the registry mutex is held.

use std::future::Future;
use std::time::Duration;

use hearth_domain::actuator::{ActuatorKind, OutputLevel};
use hearth_domain::channel::ChannelIdentity;
use hearth_domain::error::DriverError;

/// Factory for live output-channel connections.
///
/// Implementations live in adapter crates (e.g. the virtual hub). Opening
/// waits for physical attachment up to the given bound.
pub trait OutputDriver: Send + Sync {
    /// The live connection type this driver hands out.
    type Connection: OutputConnection;

    /// Open a connection to the channel, waiting up to `wait` for it to be
    /// physically attached.
    fn open(
        &self,
        identity: ChannelIdentity,
        kind: ActuatorKind,
        wait: Duration,
    ) -> impl Future<Output = Result<Self::Connection, DriverError>> + Send;
}

/// A live connection to one output channel.
pub trait OutputConnection: Send {
    /// Drive the channel to the given level.
    ///
    /// Fails with [`DriverError::NotAttached`] when the channel has detached
    /// underneath the connection.
    fn apply(
        &mut self,
        level: OutputLevel,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Close the connection. Closing twice is a driver fault, reported but
    /// harmless.
    fn close(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;
}
