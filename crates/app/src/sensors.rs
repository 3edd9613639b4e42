//! Sensor subscriptions — ingestion, dewpoint augmentation, and fan-out.
//!
//! The hub tracks active subscriptions behind its own mutex (the device
//! registry's lock is never involved). Transport adapters push raw payloads
//! into [`SensorSubscription::ingest`] from their own background tasks;
//! delivery to subscriber callbacks is synchronous and in registration order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;

use hearth_domain::id::SensorId;
use hearth_domain::sensor::{BrokerEndpoint, Reading, SensorKind, augment_dewpoint};

/// Callback invoked with each augmented reading.
pub type ReadingCallback = Arc<dyn Fn(&Reading) + Send + Sync>;

/// One sensor subscription as seen by view code.
#[derive(Debug, Clone, Serialize)]
pub struct SensorInfo {
    pub id: SensorId,
    pub kind: SensorKind,
    pub topic: String,
    pub broker: BrokerEndpoint,
    pub last_reading_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct SubscriptionState {
    callbacks: Vec<ReadingCallback>,
    last_reading_at: Option<DateTime<Utc>>,
}

/// A single topic subscription with its ordered subscriber callbacks.
pub struct SensorSubscription {
    id: SensorId,
    kind: SensorKind,
    topic: String,
    endpoint: BrokerEndpoint,
    stopped: AtomicBool,
    stop_signal: Notify,
    state: Mutex<SubscriptionState>,
}

impl SensorSubscription {
    fn new(kind: SensorKind, topic: String, endpoint: BrokerEndpoint) -> Self {
        Self {
            id: SensorId::new(),
            kind,
            topic,
            endpoint,
            stopped: AtomicBool::new(false),
            stop_signal: Notify::new(),
            state: Mutex::new(SubscriptionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SubscriptionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn id(&self) -> SensorId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn endpoint(&self) -> &BrokerEndpoint {
        &self.endpoint
    }

    /// Append a subscriber callback. Delivery order is registration order.
    pub fn subscribe(&self, callback: impl Fn(&Reading) + Send + Sync + 'static) {
        self.state().callbacks.push(Arc::new(callback));
    }

    /// Ingest one raw payload from the transport.
    ///
    /// Malformed payloads (invalid JSON, or JSON that is not an object) are
    /// logged and dropped — they never reach subscribers and never fault the
    /// transport loop. A panicking subscriber is caught so the remaining
    /// callbacks in the same delivery still run.
    pub fn ingest(&self, payload: &[u8]) {
        if self.is_stopped() {
            return;
        }

        let mut reading: Reading = match serde_json::from_slice(payload) {
            Ok(serde_json::Value::Object(fields)) => fields,
            Ok(other) => {
                tracing::warn!(
                    topic = %self.topic,
                    payload_type = %json_type(&other),
                    "dropping non-object sensor payload"
                );
                return;
            }
            Err(err) => {
                tracing::warn!(topic = %self.topic, error = %err, "dropping malformed sensor payload");
                return;
            }
        };
        augment_dewpoint(&mut reading);

        // callbacks run outside the lock: a subscriber that re-enters the
        // subscription (to subscribe or stop) must not deadlock
        let callbacks = {
            let mut state = self.state();
            state.last_reading_at = Some(Utc::now());
            state.callbacks.clone()
        };
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&reading))).is_err() {
                tracing::error!(topic = %self.topic, "sensor subscriber panicked during delivery");
            }
        }
    }

    /// Halt the transport loop and silence further deliveries. Idempotent.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!(sensor = %self.id, topic = %self.topic, "sensor subscription stopped");
        }
        self.stop_signal.notify_waiters();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolve once [`stop`](Self::stop) has been called. Transport loops
    /// select on this to shut down.
    pub async fn stopped(&self) {
        loop {
            // arm the waiter before checking the flag so a concurrent stop
            // cannot slip between the check and the await
            let notified = self.stop_signal.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }

    fn info(&self) -> SensorInfo {
        SensorInfo {
            id: self.id,
            kind: self.kind,
            topic: self.topic.clone(),
            broker: self.endpoint.clone(),
            last_reading_at: self.state().last_reading_at,
        }
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Registry of active sensor subscriptions.
#[derive(Default)]
pub struct SensorHub {
    subscriptions: Mutex<Vec<Arc<SensorSubscription>>>,
}

impl SensorHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<Arc<SensorSubscription>>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Create and track a subscription. The transport adapter starts its
    /// background loop with the returned handle.
    pub fn register(
        &self,
        kind: SensorKind,
        topic: impl Into<String>,
        endpoint: BrokerEndpoint,
    ) -> Arc<SensorSubscription> {
        let subscription = Arc::new(SensorSubscription::new(kind, topic.into(), endpoint));
        self.subscriptions().push(Arc::clone(&subscription));
        tracing::info!(
            sensor = %subscription.id,
            topic = %subscription.topic,
            broker = %subscription.endpoint,
            "sensor registered"
        );
        subscription
    }

    /// Look up a subscription by id.
    #[must_use]
    pub fn get(&self, id: SensorId) -> Option<Arc<SensorSubscription>> {
        self.subscriptions()
            .iter()
            .find(|subscription| subscription.id == id)
            .cloned()
    }

    /// Snapshot of every tracked subscription, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<SensorInfo> {
        self.subscriptions()
            .iter()
            .map(|subscription| subscription.info())
            .collect()
    }

    /// Stop every subscription. Used on shutdown; stop is idempotent so
    /// racing with individual stops is harmless.
    pub fn stop_all(&self) {
        let subscriptions: Vec<Arc<SensorSubscription>> = self.subscriptions().clone();
        for subscription in subscriptions {
            subscription.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> BrokerEndpoint {
        BrokerEndpoint {
            host: "broker.local".to_string(),
            port: 1883,
        }
    }

    fn collector(
        subscription: &SensorSubscription,
    ) -> Arc<Mutex<Vec<Reading>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        subscription.subscribe(move |reading| {
            sink.lock().unwrap().push(reading.clone());
        });
        seen
    }

    #[test]
    fn should_deliver_augmented_reading_exactly_once() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());
        let seen = collector(&subscription);

        subscription.ingest(br#"{"temperature": 20, "humidity": 60}"#);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("dewpoint").and_then(|v| v.as_f64()), Some(12.0));
    }

    #[test]
    fn should_deliver_reading_unchanged_when_humidity_low() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());
        let seen = collector(&subscription);

        subscription.ingest(br#"{"temperature": 20, "humidity": 40}"#);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].contains_key("dewpoint"));
    }

    #[test]
    fn should_drop_malformed_payload_without_delivering() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());
        let seen = collector(&subscription);

        subscription.ingest(b"not json at all");
        subscription.ingest(b"[1, 2, 3]");
        subscription.ingest(b"42");

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn should_deliver_in_registration_order() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());

        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            subscription.subscribe(move |_| order.lock().unwrap().push(tag));
        }

        subscription.ingest(br#"{"temperature": 21}"#);

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn should_keep_delivering_after_a_subscriber_panics() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());

        subscription.subscribe(|_| panic!("bad subscriber"));
        let seen = collector(&subscription);

        subscription.ingest(br#"{"temperature": 21}"#);
        subscription.ingest(br#"{"temperature": 22}"#);

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn should_deliver_nothing_after_stop() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());
        let seen = collector(&subscription);

        subscription.ingest(br#"{"temperature": 21}"#);
        subscription.stop();
        subscription.stop();
        subscription.ingest(br#"{"temperature": 22}"#);

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(subscription.is_stopped());
    }

    #[test]
    fn should_list_registered_sensors_with_kind_and_topic() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "zigbee2mqtt/thermostats/01", endpoint());

        let infos = hub.list();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].id, subscription.id());
        assert_eq!(infos[0].kind, SensorKind::Mqtt);
        assert_eq!(infos[0].topic, "zigbee2mqtt/thermostats/01");
        assert!(infos[0].last_reading_at.is_none());
    }

    #[test]
    fn should_record_last_reading_time_on_ingest() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());

        subscription.ingest(br#"{"temperature": 21}"#);

        assert!(hub.list()[0].last_reading_at.is_some());
    }

    #[test]
    fn should_find_subscription_by_id() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());

        assert!(hub.get(subscription.id()).is_some());
        assert!(hub.get(SensorId::new()).is_none());
    }

    #[test]
    fn should_stop_every_subscription_on_stop_all() {
        let hub = SensorHub::new();
        let a = hub.register(SensorKind::Mqtt, "topic/a", endpoint());
        let b = hub.register(SensorKind::Mqtt, "topic/b", endpoint());

        hub.stop_all();

        assert!(a.is_stopped());
        assert!(b.is_stopped());
    }

    #[tokio::test]
    async fn should_wake_stopped_waiter_when_stop_called() {
        let hub = SensorHub::new();
        let subscription = hub.register(SensorKind::Mqtt, "home/office/climate", endpoint());

        let waiter = {
            let subscription = Arc::clone(&subscription);
            tokio::spawn(async move { subscription.stopped().await })
        };
        subscription.stop();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter never woke")
            .unwrap();
    }
}
