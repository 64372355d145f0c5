// ── Realtime channel manager ──
//
// One shared WebSocket connection, many independent subscribers. The
// registry of callbacks lives here rather than in the transport, so a
// reconnect keeps every registration and replays the initial-data
// requests (`get-<event>`) once the socket is back.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use dashmap::{DashMap, DashSet};
use serde::de::DeserializeOwned;
use serde_json::Value;
use smartfarm_api::{ClientMessage, ConnectionState, RealtimeHandle, ReconnectPolicy, ServerMessage, Session};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::CoreError;

type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Where and how to open the realtime connection.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub ws_url: Url,
    pub reconnect: ReconnectPolicy,
}

struct Registration {
    id: Uuid,
    callback: Callback,
}

/// Shared realtime connection with named-event fan-out.
///
/// Cheap to clone. Every clone talks to the same connection and registry.
#[derive(Clone)]
pub struct ChannelManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ChannelConfig,
    session: Option<Session>,
    registry: DashMap<String, Vec<Registration>>,
    /// Events whose initial value is requested after every connect.
    requested: DashSet<String>,
    state_tx: watch::Sender<ConnectionState>,
    handle: ArcSwapOption<RealtimeHandle>,
    transport: Mutex<Option<Transport>>,
}

struct Transport {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ChannelManager {
    /// Create a manager. Nothing connects until [`connect`](Self::connect).
    pub fn new(config: ChannelConfig, session: Option<Session>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                session,
                registry: DashMap::new(),
                requested: DashSet::new(),
                state_tx,
                handle: ArcSwapOption::empty(),
                transport: Mutex::new(None),
            }),
        }
    }

    // ── Registrations ────────────────────────────────────────────────

    /// Run `callback` with the payload of every `event` frame.
    ///
    /// Registrations are additive. Dropping the returned handle removes
    /// this callback only.
    pub fn subscribe<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.inner
            .registry
            .entry(event.to_owned())
            .or_default()
            .push(Registration {
                id,
                callback: Arc::new(callback),
            });
        debug!(event, %id, "channel subscription added");
        Subscription {
            manager: Arc::downgrade(&self.inner),
            event: event.to_owned(),
            id,
        }
    }

    /// Subscribe and ask the server for the current value of `event`.
    /// The request is sent now if connected and again after every
    /// reconnect.
    pub fn subscribe_with_request<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let subscription = self.subscribe(event, callback);
        self.inner.requested.insert(event.to_owned());
        if self.is_connected() {
            if let Err(e) = self.send(ClientMessage::request(event)) {
                warn!(event, error = %e, "initial data request failed");
            }
        }
        subscription
    }

    /// Typed variant of [`subscribe`](Self::subscribe). Payloads that do
    /// not deserialize into `T` are skipped.
    pub fn subscribe_typed<T, F>(&self, event: &str, callback: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let name = event.to_owned();
        self.subscribe(event, move |value| match T::deserialize(value) {
            Ok(payload) => callback(payload),
            Err(e) => debug!(event = %name, error = %e, "skipping malformed payload"),
        })
    }

    /// Drop every callback registered for `event`.
    pub fn unsubscribe(&self, event: &str) {
        let removed = self.inner.registry.remove(event).map_or(0, |(_, regs)| regs.len());
        self.inner.requested.remove(event);
        debug!(event, removed, "channel unsubscribed");
    }

    /// Number of callbacks currently registered for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner.registry.get(event).map_or(0, |regs| regs.len())
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Open the connection. No-op if a live transport already exists; a
    /// transport that gave up (`Failed`) is replaced.
    pub async fn connect(&self) {
        let mut transport = self.inner.transport.lock().await;
        if transport.is_some() {
            if *self.inner.state_tx.borrow() != ConnectionState::Failed {
                return;
            }
            if let Some(old) = transport.take() {
                self.inner.teardown(old).await;
            }
        }

        info!(url = %self.inner.config.ws_url, "opening realtime channel");
        let cancel = CancellationToken::new();
        let handle = Arc::new(RealtimeHandle::connect(
            self.inner.config.ws_url.clone(),
            self.inner.session.clone(),
            self.inner.config.reconnect,
            cancel.child_token(),
        ));

        let tasks = vec![
            tokio::spawn(dispatch_task(
                Arc::downgrade(&self.inner),
                handle.subscribe(),
                cancel.clone(),
            )),
            tokio::spawn(state_task(
                Arc::downgrade(&self.inner),
                handle.state(),
                cancel.clone(),
            )),
        ];
        self.inner.handle.store(Some(handle));
        *transport = Some(Transport { cancel, tasks });
    }

    /// Close the connection. Registrations are kept for the next
    /// [`connect`](Self::connect).
    pub async fn disconnect(&self) {
        let Some(old) = self.inner.transport.lock().await.take() else {
            return;
        };
        self.inner.teardown(old).await;
        info!("realtime channel closed");
    }

    /// Send a `{type, data}` frame.
    pub fn send(&self, message: ClientMessage) -> Result<(), CoreError> {
        let guard = self.inner.handle.load();
        let Some(handle) = &*guard else {
            warn!(event = %message.event, "realtime channel not connected, dropping message");
            return Err(CoreError::ChannelClosed);
        };
        handle.send(message).map_err(|e| {
            warn!(error = %e, "realtime send failed");
            CoreError::from(e)
        })
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.state_tx.borrow() == ConnectionState::Connected
    }
}

impl Inner {
    async fn teardown(&self, transport: Transport) {
        if let Some(handle) = self.handle.swap(None) {
            handle.shutdown();
        }
        transport.cancel.cancel();
        for task in transport.tasks {
            let _ = task.await;
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    fn dispatch(&self, message: &ServerMessage) {
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<Callback> = match self.registry.get(&message.event) {
            Some(regs) => regs.iter().map(|r| Arc::clone(&r.callback)).collect(),
            None => {
                debug!(event = %message.event, "no subscribers, dropping event");
                return;
            }
        };
        for callback in callbacks {
            callback(&message.data);
        }
    }

    fn replay_requests(&self, handle: &RealtimeHandle) {
        let events: Vec<String> = self.requested.iter().map(|e| e.key().clone()).collect();
        for event in events {
            if !self.registry.contains_key(&event) {
                continue;
            }
            debug!(%event, "replaying initial data request");
            if let Err(e) = handle.send(ClientMessage::request(&event)) {
                warn!(%event, error = %e, "initial data request failed");
            }
        }
    }

    fn remove_registration(&self, event: &str, id: Uuid) {
        if let Some(mut regs) = self.registry.get_mut(event) {
            regs.retain(|r| r.id != id);
        }
        if self.registry.remove_if(event, |_, regs| regs.is_empty()).is_some() {
            self.requested.remove(event);
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn dispatch_task(
    inner: Weak<Inner>,
    mut events: broadcast::Receiver<Arc<ServerMessage>>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = events.recv() => message,
        };
        match message {
            Ok(message) => {
                let Some(inner) = inner.upgrade() else { break };
                inner.dispatch(&message);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "realtime dispatcher lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn state_task(inner: Weak<Inner>, mut state: watch::Receiver<ConnectionState>, cancel: CancellationToken) {
    loop {
        let current = *state.borrow_and_update();
        let Some(strong) = inner.upgrade() else { break };
        strong.state_tx.send_replace(current);
        match current {
            ConnectionState::Connected => {
                info!("realtime channel connected");
                if let Some(handle) = strong.handle.load_full() {
                    strong.replay_requests(&handle);
                }
            }
            ConnectionState::Reconnecting { attempt } => info!(attempt, "realtime channel reconnecting"),
            ConnectionState::Failed => warn!("realtime channel gave up reconnecting"),
            ConnectionState::Connecting | ConnectionState::Disconnected => {}
        }
        drop(strong);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

// ── Subscription handle ──────────────────────────────────────────────

/// Registration handle returned by [`ChannelManager::subscribe`].
/// Dropping it removes the callback.
#[must_use = "dropping a Subscription removes the callback immediately"]
pub struct Subscription {
    manager: Weak<Inner>,
    event: String,
    id: Uuid,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove the callback now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.manager.upgrade() {
            inner.remove_registration(&self.event, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    fn manager() -> ChannelManager {
        ChannelManager::new(
            ChannelConfig {
                ws_url: Url::parse("ws://127.0.0.1:9/ws").unwrap(),
                reconnect: ReconnectPolicy::default(),
            },
            None,
        )
    }

    fn counter(manager: &ChannelManager, event: &str) -> (Subscription, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let sub = manager.subscribe(event, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (sub, hits)
    }

    fn frame(event: &str) -> ServerMessage {
        ServerMessage {
            event: event.into(),
            data: json!({"price": 310.0}),
        }
    }

    #[test]
    fn fan_out_to_every_subscriber() {
        let manager = manager();
        let (_a, a_hits) = counter(&manager, "priceUpdate");
        let (_b, b_hits) = counter(&manager, "priceUpdate");

        manager.inner.dispatch(&frame("priceUpdate"));

        assert_eq!(a_hits.load(Ordering::SeqCst), 1);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_one_handle_keeps_the_other() {
        let manager = manager();
        let (a, a_hits) = counter(&manager, "priceUpdate");
        let (_b, b_hits) = counter(&manager, "priceUpdate");

        drop(a);
        manager.inner.dispatch(&frame("priceUpdate"));

        assert_eq!(a_hits.load(Ordering::SeqCst), 0);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
        assert_eq!(manager.subscriber_count("priceUpdate"), 1);
    }

    #[test]
    fn last_handle_destroys_the_channel() {
        let manager = manager();
        let sub = manager.subscribe_with_request("alertTriggered", |_| {});
        assert!(manager.inner.requested.contains("alertTriggered"));

        sub.cancel();
        assert_eq!(manager.subscriber_count("alertTriggered"), 0);
        assert!(!manager.inner.registry.contains_key("alertTriggered"));
        assert!(!manager.inner.requested.contains("alertTriggered"));
    }

    #[test]
    fn unsubscribe_silences_every_callback() {
        let manager = manager();
        let (_a, a_hits) = counter(&manager, "priceUpdate");
        let (_b, b_hits) = counter(&manager, "priceUpdate");

        manager.unsubscribe("priceUpdate");
        manager.inner.dispatch(&frame("priceUpdate"));

        assert_eq!(a_hits.load(Ordering::SeqCst) + b_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_events_are_dropped() {
        let manager = manager();
        let (_a, hits) = counter(&manager, "priceUpdate");
        manager.inner.dispatch(&frame("weatherUpdate"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let manager = manager();
        let handle = manager.clone();
        let _sub = manager.subscribe("priceUpdate", move |_| handle.unsubscribe("priceUpdate"));
        manager.inner.dispatch(&frame("priceUpdate"));
        assert_eq!(manager.subscriber_count("priceUpdate"), 0);
    }

    #[test]
    fn typed_subscription_skips_bad_payloads() {
        #[derive(serde::Deserialize)]
        struct Price {
            price: f64,
        }

        let manager = manager();
        let total = Arc::new(std::sync::Mutex::new(0.0));
        let sink = Arc::clone(&total);
        let _sub = manager.subscribe_typed("priceUpdate", move |p: Price| {
            *sink.lock().unwrap() += p.price;
        });

        manager.inner.dispatch(&frame("priceUpdate"));
        manager.inner.dispatch(&ServerMessage {
            event: "priceUpdate".into(),
            data: json!("garbage"),
        });

        assert!((*total.lock().unwrap() - 310.0).abs() < f64::EPSILON);
    }

    #[test]
    fn send_without_connection_is_channel_closed() {
        let manager = manager();
        let err = manager
            .send(ClientMessage::request("priceUpdate"))
            .unwrap_err();
        assert!(matches!(err, CoreError::ChannelClosed));
    }
}
