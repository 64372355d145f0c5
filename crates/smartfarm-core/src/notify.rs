// ── Transient user notifications ──
//
// Success and failure messages from mutations, failed queries and
// realtime state changes. Delivered on a broadcast channel; consumers
// that are not listening simply miss them.

use strum::Display;
use tokio::sync::broadcast;
use tracing::{info, warn};

const NOTIFICATION_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Cloneable sender side of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(NotificationLevel::Success, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(NotificationLevel::Info, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(NotificationLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(NotificationLevel::Error, message.into());
    }

    fn emit(&self, level: NotificationLevel, message: String) {
        match level {
            NotificationLevel::Success | NotificationLevel::Info => info!(%level, "{message}"),
            NotificationLevel::Warning | NotificationLevel::Error => warn!(%level, "{message}"),
        }
        // No receivers is fine.
        let _ = self.tx.send(Notification { level, message });
    }
}
