// ── Bearer-token session ──
//
// Shared between the REST client (Authorization header, refresh-on-401)
// and the realtime channel (`?token=` on the upgrade URL). Lock-free
// reads via `ArcSwapOption`; every request sees the latest token.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};

/// Access + refresh token pair issued by the auth endpoints.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: Option<SecretString>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: refresh.map(SecretString::from),
        }
    }
}

/// Cheaply cloneable handle to the current tokens.
#[derive(Debug, Clone, Default)]
pub struct Session {
    tokens: Arc<ArcSwapOption<TokenPair>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        let session = Self::new();
        session.set(tokens);
        session
    }

    /// Replace both tokens.
    pub fn set(&self, tokens: TokenPair) {
        self.tokens.store(Some(Arc::new(tokens)));
    }

    /// Swap in a refreshed access token, keeping the refresh token.
    pub fn set_access(&self, access: SecretString) {
        let refresh = self.refresh_token();
        self.tokens.store(Some(Arc::new(TokenPair { access, refresh })));
    }

    /// Drop all tokens (logout or failed refresh).
    pub fn clear(&self) {
        self.tokens.store(None);
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.load().is_some()
    }

    pub fn access_token(&self) -> Option<SecretString> {
        self.tokens.load().as_ref().map(|t| t.access.clone())
    }

    pub fn refresh_token(&self) -> Option<SecretString> {
        self.tokens.load().as_ref().and_then(|t| t.refresh.clone())
    }

    /// `Bearer <token>` header value, if a session exists.
    pub(crate) fn bearer(&self) -> Option<String> {
        self.tokens
            .load()
            .as_ref()
            .map(|t| format!("Bearer {}", t.access.expose_secret()))
    }
}
