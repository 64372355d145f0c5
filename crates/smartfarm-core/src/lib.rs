// smartfarm-core: Query cache, invalidation and realtime channel layer between smartfarm-api and consumers.

pub mod backend;
pub mod channel;
pub mod command;
pub mod config;
mod context;
pub mod domains;
pub mod error;
pub mod keys;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod resource;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{ALERT_TRIGGERED_EVENT, Backend, PRICE_UPDATE_EVENT, RealtimeValue};
pub use channel::{ChannelConfig, ChannelManager, Subscription};
pub use command::{Command, CommandResult};
pub use config::{AuthCredentials, BackendConfig, TlsVerification, derive_ws_url};
pub use error::CoreError;
pub use mutation::CacheEffects;
pub use notify::{Notification, NotificationLevel, Notifier};
pub use query::{PollHandle, QueryCache, QueryKey, QueryObserver, QueryResult, QueryStatus};
pub use resource::{ListView, MutationOp, Resource, ResourceClient, ResourceSpec, StatsResource};

pub use smartfarm_api::types;
pub use smartfarm_api::{ConnectionState, ReconnectPolicy};
