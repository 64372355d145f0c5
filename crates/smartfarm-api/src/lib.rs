// smartfarm-api: Async Rust client for the SmartFarm REST API and realtime channel

pub mod auth;
pub mod client;
pub mod error;
pub mod realtime;
pub mod session;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::Error;
pub use realtime::{ClientMessage, ConnectionState, ReconnectPolicy, RealtimeHandle, ServerMessage};
pub use session::{Session, TokenPair};
pub use transport::{TlsMode, TransportConfig};
