//! Bearer-token session shared between the authenticate flow and request
//! building.
//!
//! # Design
//! The token is written only by `BankingClient::authenticate` and read every
//! time a request is built with `use_auth`. It lives behind an
//! `ArcSwapOption` so readers take a lock-free snapshot and a concurrent
//! authenticate never tears a read. No expiry or refresh: a token is used
//! until it is replaced or cleared.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

pub struct Session {
    token: ArcSwapOption<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            token: ArcSwapOption::empty(),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(token);
        session
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.token.store(Some(Arc::new(token.into())));
    }

    /// Snapshot of the current token, if any.
    pub fn token(&self) -> Option<Arc<String>> {
        self.token.load_full()
    }

    pub fn clear(&self) {
        self.token.store(None);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
