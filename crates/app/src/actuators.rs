//! Actuator lifecycle — claiming channels and driving live connections.
//!
//! The supervisor keeps a name→slot map. Each slot serializes operations on
//! one actuator name behind its own async mutex, so two requests for the same
//! name collapse onto a single live connection while requests for different
//! names never wait on each other's driver I/O. The registry mutex is only
//! ever taken for the short claim/release mutations, never across an open or
//! close.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use hearth_domain::actuator::{ActuatorKind, OutputLevel};
use hearth_domain::channel::{ChannelIdentity, ChannelTarget};
use hearth_domain::error::{HearthError, NotFoundError, ValidationError};

use crate::ports::{OutputConnection, OutputDriver};
use crate::registry::DeviceRegistry;

/// How long [`ActuatorSupervisor`] waits for physical attachment by default.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// One live actuator as seen by view code.
#[derive(Debug, Clone, Serialize)]
pub struct ActuatorSnapshot {
    pub name: String,
    pub identity: ChannelIdentity,
    pub kind: ActuatorKind,
    /// Last level successfully applied, if any.
    pub level: Option<OutputLevel>,
}

struct Entry<C> {
    identity: ChannelIdentity,
    kind: ActuatorKind,
    level: Option<OutputLevel>,
    connection: C,
}

type Slot<C> = Arc<tokio::sync::Mutex<Option<Entry<C>>>>;

/// Creates and tears down named actuators bound to discovered channels.
///
/// Invariant: an identity is marked in-use in the registry exactly while a
/// slot holds a live connection for it (or an open for it is in flight —
/// failed opens release before returning).
pub struct ActuatorSupervisor<D: OutputDriver> {
    registry: Arc<DeviceRegistry>,
    driver: D,
    open_timeout: Duration,
    slots: Mutex<HashMap<String, Slot<D::Connection>>>,
}

impl<D: OutputDriver> ActuatorSupervisor<D> {
    /// Create a supervisor driving channels through `driver`.
    pub fn new(registry: Arc<DeviceRegistry>, driver: D, open_timeout: Duration) -> Self {
        Self {
            registry,
            driver,
            open_timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot<D::Connection>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get or create the slot for `name`. The map lock is held only for the
    /// lookup itself.
    fn slot(&self, name: &str) -> Slot<D::Connection> {
        let mut slots = self.slots();
        Arc::clone(
            slots
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None))),
        )
    }

    /// Whether `slot` is still the one registered under `name`. A close
    /// racing with an open can orphan a slot; the open loop re-fetches when
    /// that happens.
    fn slot_is_current(&self, name: &str, slot: &Slot<D::Connection>) -> bool {
        self.slots()
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Drive the named actuator to `level`, creating it first if needed.
    ///
    /// An existing live actuator under `name` short-circuits: the target is
    /// ignored and the level goes to the existing connection. Otherwise the
    /// caller must supply a target; the channel is claimed, opened with the
    /// bounded attachment wait, and the claim is rolled back if the open
    /// fails.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] for bad names, levels, or a missing target;
    /// [`HearthError::NotFound`] / [`HearthError::AlreadyInUse`] from the
    /// claim; [`HearthError::Driver`] when the open times out or the
    /// connection rejects the level.
    #[tracing::instrument(skip(self, target), fields(%level))]
    pub async fn set_state(
        &self,
        name: &str,
        target: Option<ChannelTarget>,
        kind: ActuatorKind,
        level: OutputLevel,
    ) -> Result<(), HearthError> {
        self.drive(name, target, kind, Some(level)).await
    }

    /// Create the named actuator without applying a level.
    ///
    /// Used when restoring persisted actuators at startup. A live actuator
    /// under `name` makes this a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`set_state`](Self::set_state), minus level validation.
    pub async fn open(
        &self,
        name: &str,
        target: ChannelTarget,
        kind: ActuatorKind,
    ) -> Result<(), HearthError> {
        self.drive(name, Some(target), kind, None).await
    }

    async fn drive(
        &self,
        name: &str,
        target: Option<ChannelTarget>,
        kind: ActuatorKind,
        level: Option<OutputLevel>,
    ) -> Result<(), HearthError> {
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(level) = level {
            level.validate_for(kind)?;
        }

        loop {
            let slot = self.slot(name);
            let mut guard = slot.lock().await;

            if let Some(entry) = guard.as_mut() {
                let Some(level) = level else {
                    return Ok(());
                };
                // the live handle decides the kind, not the request
                level.validate_for(entry.kind)?;
                entry.connection.apply(level).await?;
                entry.level = Some(level);
                return Ok(());
            }

            // empty slot — make sure a concurrent close has not unregistered
            // it, otherwise we would open a connection nobody can see
            if !self.slot_is_current(name, &slot) {
                continue;
            }

            let Some(target) = target else {
                return Err(ValidationError::MissingTarget.into());
            };

            let channel = self.registry.claim_target(&target)?;
            let identity = channel.identity;
            if identity.class != kind.channel_class() {
                self.registry.release(&identity);
                return Err(ValidationError::ChannelKindMismatch {
                    class: identity.class,
                    kind,
                }
                .into());
            }

            // driver I/O happens outside the registry mutex; only this name's
            // slot stays locked
            let mut connection = match self.driver.open(identity, kind, self.open_timeout).await {
                Ok(connection) => connection,
                Err(err) => {
                    tracing::warn!(%identity, error = %err, "open failed, releasing claim");
                    self.registry.release(&identity);
                    return Err(err.into());
                }
            };

            let applied = match level {
                Some(level) => connection.apply(level).await.map(|()| Some(level)),
                None => Ok(None),
            };

            // the connection is live either way; keep the handle and surface
            // the apply failure to the caller
            let (level, result) = match applied {
                Ok(level) => (level, Ok(())),
                Err(err) => (None, Err(err.into())),
            };
            *guard = Some(Entry {
                identity,
                kind,
                level,
                connection,
            });
            tracing::info!(actuator = name, %identity, %kind, "actuator opened");
            return result;
        }
    }

    /// Close the named actuator and release its channel.
    ///
    /// Safe to call after the underlying channel has already detached: the
    /// driver fault from closing a dead connection is logged and swallowed,
    /// and the release is idempotent.
    ///
    /// # Errors
    ///
    /// [`HearthError::NotFound`] when no live actuator has this name.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self, name: &str) -> Result<(), HearthError> {
        let slot = self.slots().remove(name);
        let entry = match slot {
            Some(slot) => slot.lock().await.take(),
            None => None,
        };
        let Some(mut entry) = entry else {
            return Err(NotFoundError {
                entity: "Actuator",
                id: name.to_string(),
            }
            .into());
        };

        if let Err(err) = entry.connection.close().await {
            tracing::warn!(actuator = name, error = %err, "driver fault on close, ignoring");
        }
        self.registry.release(&entry.identity);
        tracing::info!(actuator = name, identity = %entry.identity, "actuator closed");
        Ok(())
    }

    /// Close every live actuator. Used on shutdown.
    pub async fn drain(&self) {
        let slots: Vec<(String, Slot<D::Connection>)> = self.slots().drain().collect();
        for (name, slot) in slots {
            let Some(mut entry) = slot.lock().await.take() else {
                continue;
            };
            if let Err(err) = entry.connection.close().await {
                tracing::warn!(actuator = %name, error = %err, "driver fault on drain, ignoring");
            }
            self.registry.release(&entry.identity);
        }
    }

    /// Live actuators with their last applied levels.
    ///
    /// An actuator whose slot is busy (an open or command in flight) is
    /// omitted; it shows up once the operation completes.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActuatorSnapshot> {
        let slots: Vec<(String, Slot<D::Connection>)> = self
            .slots()
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect();

        let mut snapshots = Vec::new();
        for (name, slot) in slots {
            let Ok(guard) = slot.try_lock() else {
                continue;
            };
            if let Some(entry) = guard.as_ref() {
                snapshots.push(ActuatorSnapshot {
                    name,
                    identity: entry.identity,
                    kind: entry.kind,
                    level: entry.level,
                });
            }
        }
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use hearth_domain::channel::{ChannelClass, DiscoveredChannel};
    use hearth_domain::error::DriverError;

    #[derive(Default)]
    struct FakeDriver {
        opens: AtomicUsize,
        fail_open: AtomicBool,
        open_delay: Option<Duration>,
        detached: Arc<AtomicBool>,
    }

    struct FakeConnection {
        closed: bool,
        detached: Arc<AtomicBool>,
        applied: Vec<OutputLevel>,
    }

    impl OutputDriver for Arc<FakeDriver> {
        type Connection = FakeConnection;

        async fn open(
            &self,
            _identity: ChannelIdentity,
            _kind: ActuatorKind,
            wait: Duration,
        ) -> Result<FakeConnection, DriverError> {
            if let Some(delay) = self.open_delay {
                tokio::time::sleep(delay).await;
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(DriverError::OpenTimeout(wait));
            }
            Ok(FakeConnection {
                closed: false,
                detached: Arc::clone(&self.detached),
                applied: Vec::new(),
            })
        }
    }

    impl OutputConnection for FakeConnection {
        async fn apply(&mut self, level: OutputLevel) -> Result<(), DriverError> {
            if self.closed {
                return Err(DriverError::Closed);
            }
            if self.detached.load(Ordering::SeqCst) {
                return Err(DriverError::NotAttached);
            }
            self.applied.push(level);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), DriverError> {
            if self.closed {
                return Err(DriverError::Closed);
            }
            self.closed = true;
            Ok(())
        }
    }

    fn identity(channel: i32, class: ChannelClass) -> ChannelIdentity {
        ChannelIdentity {
            controller_serial: 620003,
            hub_port: 0,
            channel,
            class,
        }
    }

    fn discovered(channel: i32, class: ChannelClass) -> DiscoveredChannel {
        DiscoveredChannel {
            identity: identity(channel, class),
            device_name: "VINT Hub".to_string(),
            channel_name: format!("Output {channel}"),
        }
    }

    fn target(channel: i32) -> ChannelTarget {
        ChannelTarget {
            channel,
            hub_port: 0,
            controller_serial: None,
        }
    }

    fn setup() -> (Arc<DeviceRegistry>, Arc<FakeDriver>, ActuatorSupervisor<Arc<FakeDriver>>) {
        let registry = Arc::new(DeviceRegistry::new(vec![
            ChannelClass::DigitalOutput,
            ChannelClass::VoltageOutput,
        ]));
        registry.attach(discovered(0, ChannelClass::DigitalOutput));
        registry.attach(discovered(1, ChannelClass::VoltageOutput));

        let driver = Arc::new(FakeDriver::default());
        let supervisor = ActuatorSupervisor::new(
            Arc::clone(&registry),
            Arc::clone(&driver),
            Duration::from_millis(50),
        );
        (registry, driver, supervisor)
    }

    #[tokio::test]
    async fn should_open_claim_and_apply_on_first_set_state() {
        let (registry, driver, supervisor) = setup();

        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();

        assert_eq!(driver.opens.load(Ordering::SeqCst), 1);
        assert!(registry.snapshot()[0].in_use);

        let snapshot = supervisor.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].level, Some(OutputLevel::Digital(true)));
    }

    #[tokio::test]
    async fn should_reject_out_of_range_voltage_before_touching_driver() {
        let (registry, driver, supervisor) = setup();

        let result = supervisor
            .set_state(
                "valve",
                Some(target(1)),
                ActuatorKind::VoltageOutput,
                OutputLevel::Voltage(10.01),
            )
            .await;

        assert!(matches!(
            result,
            Err(HearthError::Validation(
                ValidationError::VoltageOutOfRange { .. }
            ))
        ));
        assert_eq!(driver.opens.load(Ordering::SeqCst), 0);
        assert!(!registry.snapshot().iter().any(|snap| snap.in_use));
    }

    #[tokio::test]
    async fn should_accept_voltage_at_bound() {
        let (_registry, _driver, supervisor) = setup();

        supervisor
            .set_state(
                "valve",
                Some(target(1)),
                ActuatorKind::VoltageOutput,
                OutputLevel::Voltage(10.0),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_reject_unknown_name_without_target() {
        let (_registry, _driver, supervisor) = setup();

        let result = supervisor
            .set_state(
                "mystery",
                None,
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await;

        assert!(matches!(
            result,
            Err(HearthError::Validation(ValidationError::MissingTarget))
        ));
    }

    #[tokio::test]
    async fn should_release_claim_when_open_fails() {
        let (registry, driver, supervisor) = setup();
        driver.fail_open.store(true, Ordering::SeqCst);

        let result = supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await;
        assert!(matches!(result, Err(HearthError::Driver(_))));

        // rollback means the channel is claimable again
        driver.fail_open.store(false, Ordering::SeqCst);
        assert!(registry.claim(&identity(0, ChannelClass::DigitalOutput)).is_ok());
    }

    #[tokio::test]
    async fn should_fail_with_already_in_use_for_second_name_on_same_channel() {
        let (_registry, _driver, supervisor) = setup();

        supervisor
            .set_state(
                "first",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();

        let result = supervisor
            .set_state(
                "second",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(false),
            )
            .await;
        assert!(matches!(result, Err(HearthError::AlreadyInUse(_))));
    }

    #[tokio::test]
    async fn should_short_circuit_to_existing_handle_for_known_name() {
        let (_registry, driver, supervisor) = setup();

        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();
        supervisor
            .set_state(
                "circulator",
                None,
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(false),
            )
            .await
            .unwrap();

        assert_eq!(driver.opens.load(Ordering::SeqCst), 1);
        assert_eq!(
            supervisor.snapshot()[0].level,
            Some(OutputLevel::Digital(false))
        );
    }

    #[tokio::test]
    async fn should_open_once_for_concurrent_same_name_requests() {
        let registry = Arc::new(DeviceRegistry::new(vec![ChannelClass::DigitalOutput]));
        registry.attach(discovered(0, ChannelClass::DigitalOutput));
        let driver = Arc::new(FakeDriver {
            open_delay: Some(Duration::from_millis(20)),
            ..FakeDriver::default()
        });
        let supervisor = Arc::new(ActuatorSupervisor::new(
            Arc::clone(&registry),
            Arc::clone(&driver),
            Duration::from_millis(100),
        ));

        let a = {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move {
                supervisor
                    .set_state(
                        "shared",
                        Some(target(0)),
                        ActuatorKind::DigitalOutput,
                        OutputLevel::Digital(true),
                    )
                    .await
            })
        };
        let b = {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move {
                supervisor
                    .set_state(
                        "shared",
                        Some(target(0)),
                        ActuatorKind::DigitalOutput,
                        OutputLevel::Digital(false),
                    )
                    .await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(driver.opens.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_kind_not_matching_channel_class_and_release() {
        let (registry, _driver, supervisor) = setup();

        let result = supervisor
            .set_state(
                "valve",
                Some(target(0)),
                ActuatorKind::VoltageOutput,
                OutputLevel::Voltage(2.5),
            )
            .await;

        assert!(matches!(
            result,
            Err(HearthError::Validation(
                ValidationError::ChannelKindMismatch { .. }
            ))
        ));
        assert!(registry.claim(&identity(0, ChannelClass::DigitalOutput)).is_ok());
    }

    #[tokio::test]
    async fn should_surface_driver_error_when_channel_detached_under_live_handle() {
        let (registry, driver, supervisor) = setup();

        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();

        // physical detach: registry forgets the channel, the handle lives on
        registry.detach(&identity(0, ChannelClass::DigitalOutput));
        driver.detached.store(true, Ordering::SeqCst);

        let result = supervisor
            .set_state(
                "circulator",
                None,
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(false),
            )
            .await;
        assert!(matches!(
            result,
            Err(HearthError::Driver(DriverError::NotAttached))
        ));
    }

    #[tokio::test]
    async fn should_release_channel_on_close() {
        let (registry, _driver, supervisor) = setup();

        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();
        supervisor.close("circulator").await.unwrap();

        assert!(!registry.snapshot()[0].in_use);
        assert!(supervisor.snapshot().is_empty());
    }

    #[tokio::test]
    async fn should_fail_close_with_not_found_for_unknown_name() {
        let (_registry, _driver, supervisor) = setup();
        let result = supervisor.close("mystery").await;
        assert!(matches!(result, Err(HearthError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_fail_second_close_with_not_found() {
        let (_registry, _driver, supervisor) = setup();

        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();

        supervisor.close("circulator").await.unwrap();
        assert!(matches!(
            supervisor.close("circulator").await,
            Err(HearthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_allow_reopening_name_after_close() {
        let (_registry, driver, supervisor) = setup();

        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();
        supervisor.close("circulator").await.unwrap();
        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();

        assert_eq!(driver.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_drain_all_actuators_and_release_channels() {
        let (registry, _driver, supervisor) = setup();

        supervisor
            .set_state(
                "circulator",
                Some(target(0)),
                ActuatorKind::DigitalOutput,
                OutputLevel::Digital(true),
            )
            .await
            .unwrap();
        supervisor
            .set_state(
                "valve",
                Some(target(1)),
                ActuatorKind::VoltageOutput,
                OutputLevel::Voltage(-3.3),
            )
            .await
            .unwrap();

        supervisor.drain().await;

        assert!(supervisor.snapshot().is_empty());
        assert!(registry.snapshot().iter().all(|snap| !snap.in_use));
    }

    #[tokio::test]
    async fn should_open_without_applying_level() {
        let (registry, _driver, supervisor) = setup();

        supervisor
            .open("circulator", target(0), ActuatorKind::DigitalOutput)
            .await
            .unwrap();

        assert!(registry.snapshot()[0].in_use);
        assert_eq!(supervisor.snapshot()[0].level, None);
    }
}
