// ── Backend facade ──
//
// Entry point for consumers. Owns the REST client, the query cache, the
// notification channel and the realtime channel manager, and wires
// realtime events into cache invalidation.

use std::sync::Arc;

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use smartfarm_api::types::{AuthResponse, UserProfile};
use smartfarm_api::{ApiClient, ConnectionState, Session, TokenPair};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{ChannelConfig, ChannelManager, Subscription};
use crate::command::{Command, CommandResult};
use crate::config::{AuthCredentials, BackendConfig};
use crate::context::Context;
use crate::domains::{Crops, Dashboard, Farmers, Market, Recommendations, Reports, Suppliers};
use crate::error::CoreError;
use crate::keys;
use crate::notify::Notifier;
use crate::query::{QueryCache, QueryKey};
use crate::resource::ResourceClient;

/// Server-pushed event: a commodity price moved.
pub const PRICE_UPDATE_EVENT: &str = "priceUpdate";
/// Server-pushed event: one of the user's price alerts fired.
pub const ALERT_TRIGGERED_EVENT: &str = "alertTriggered";

const CONNECTION_LOST: &str = "Connection lost. Please refresh the page to reconnect.";

/// Handle to one SmartFarm backend. Cheap to clone.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    config: BackendConfig,
    ctx: Arc<Context>,
    channels: ChannelManager,
    bridge: Mutex<Vec<Subscription>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Backend {
    /// Build the REST client from `config`. Does not touch the network.
    pub fn new(config: BackendConfig) -> Result<Self, CoreError> {
        let session = match &config.auth {
            AuthCredentials::Token { access, refresh } => Session::with_tokens(TokenPair {
                access: access.clone(),
                refresh: refresh.clone(),
            }),
            AuthCredentials::None | AuthCredentials::Password { .. } => Session::new(),
        };
        let api = ApiClient::new(config.api_url.as_str(), session, &config.transport())?;
        Ok(Self::with_client(config, api))
    }

    /// Use an already-built client (custom reqwest settings, tests).
    pub fn with_client(config: BackendConfig, api: ApiClient) -> Self {
        let channels = ChannelManager::new(
            ChannelConfig {
                ws_url: config.ws_url.clone(),
                reconnect: config.reconnect,
            },
            Some(api.session().clone()),
        );
        Self {
            inner: Arc::new(BackendInner {
                config,
                ctx: Arc::new(Context::new(api, Notifier::new())),
                channels,
                bridge: Mutex::new(Vec::new()),
                tasks: Mutex::new(Vec::new()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Log in with the configured email/password. Token and anonymous
    /// configurations return `Ok(None)` without a request.
    pub async fn login(&self) -> Result<Option<AuthResponse>, CoreError> {
        match &self.inner.config.auth {
            AuthCredentials::Password { email, password } => self.login_with(email, password).await.map(Some),
            AuthCredentials::Token { .. } | AuthCredentials::None => Ok(None),
        }
    }

    pub async fn login_with(&self, email: &str, password: &SecretString) -> Result<AuthResponse, CoreError> {
        match self.api().login(email, password).await {
            Ok(resp) => {
                self.notifier().success("Successfully logged in");
                Ok(resp)
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.notifier().error(err.user_message());
                Err(err)
            }
        }
    }

    /// Forget the tokens and everything cached under them.
    pub fn logout(&self) {
        self.api().logout();
        self.cache().clear();
        self.notifier().success("Successfully logged out");
    }

    pub async fn current_user(&self) -> Result<UserProfile, CoreError> {
        Ok(self.api().current_user().await?)
    }

    // ── Realtime ─────────────────────────────────────────────────────

    /// Open the realtime channel and route its events into the cache.
    /// No-op when realtime is disabled in the config.
    pub async fn start_realtime(&self) {
        if !self.inner.config.realtime_enabled {
            debug!("realtime disabled, not connecting");
            return;
        }

        {
            let mut bridge = self.inner.bridge.lock().await;
            if bridge.is_empty() {
                bridge.extend(self.install_bridge());
                let watcher = tokio::spawn(watch_connection(
                    self.inner.channels.state(),
                    self.notifier().clone(),
                    self.inner.cancel.clone(),
                ));
                self.inner.tasks.lock().await.push(watcher);
            }
        }

        self.inner.channels.connect().await;
    }

    fn install_bridge(&self) -> Vec<Subscription> {
        let prices = self.cache().clone();
        let alerts = self.cache().clone();
        vec![
            self.inner.channels.subscribe(PRICE_UPDATE_EVENT, move |_| {
                let n = prices.invalidate_many(&[
                    QueryKey::new(keys::MARKET_PRICES),
                    QueryKey::new(keys::MARKET_STATS),
                    QueryKey::new(keys::PRICE_TRENDS),
                ]);
                debug!(invalidated = n, "price update received");
            }),
            self.inner.channels.subscribe(ALERT_TRIGGERED_EVENT, move |_| {
                let n = alerts.invalidate(&QueryKey::new(keys::PRICE_ALERTS));
                debug!(invalidated = n, "price alert triggered");
            }),
        ]
    }

    /// Latest value of a server-pushed `event`, requested on subscribe and
    /// after every reconnect.
    pub fn realtime_value<T>(&self, event: &str) -> RealtimeValue<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let notifier = self.notifier().clone();
        let name = event.to_owned();
        let subscription = self.inner.channels.subscribe_with_request(event, move |value| {
            match T::deserialize(value) {
                Ok(v) => {
                    tx.send_replace(Some(Arc::new(v)));
                }
                Err(e) => {
                    warn!(event = %name, error = %e, "realtime payload did not parse");
                    notifier.error(format!("Failed to load {name} data"));
                }
            }
        });
        RealtimeValue {
            rx,
            _subscription: subscription,
        }
    }

    /// Close the realtime channel and stop background tasks.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.bridge.lock().await.clear();
        self.inner.channels.disconnect().await;
        let mut tasks = self.inner.tasks.lock().await;
        for task in tasks.drain(..) {
            let _ = task.await;
        }
        info!("backend shut down");
    }

    // ── Domain clients ───────────────────────────────────────────────

    pub fn farmers(&self) -> ResourceClient<Farmers> {
        ResourceClient::new(Arc::clone(&self.inner.ctx))
    }

    pub fn crops(&self) -> ResourceClient<Crops> {
        ResourceClient::new(Arc::clone(&self.inner.ctx))
    }

    pub fn suppliers(&self) -> ResourceClient<Suppliers> {
        ResourceClient::new(Arc::clone(&self.inner.ctx))
    }

    pub fn recommendations(&self) -> ResourceClient<Recommendations> {
        ResourceClient::new(Arc::clone(&self.inner.ctx))
    }

    pub fn market(&self) -> Market {
        Market::new(Arc::clone(&self.inner.ctx))
    }

    pub fn reports(&self) -> Reports {
        Reports::new(Arc::clone(&self.inner.ctx))
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(Arc::clone(&self.inner.ctx))
    }

    /// Run a non-CRUD command directly.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        self.inner.ctx.execute(command).await
    }

    // ── Shared state ─────────────────────────────────────────────────

    pub fn cache(&self) -> &QueryCache {
        &self.inner.ctx.cache
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.ctx.notifier
    }

    pub fn channels(&self) -> &ChannelManager {
        &self.inner.channels
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.ctx.api
    }
}

/// Tells the user once when the channel gives up reconnecting.
async fn watch_connection(
    mut state: watch::Receiver<ConnectionState>,
    notifier: Notifier,
    cancel: CancellationToken,
) {
    let mut reported = false;
    loop {
        let failed = *state.borrow_and_update() == ConnectionState::Failed;
        if failed && !reported {
            notifier.error(CONNECTION_LOST);
        }
        reported = failed;

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

/// Most recent payload of a realtime event. Dropping it unsubscribes.
pub struct RealtimeValue<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
    _subscription: Subscription,
}

impl<T> RealtimeValue<T> {
    pub fn latest(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }

    /// Wait for the next payload.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}
