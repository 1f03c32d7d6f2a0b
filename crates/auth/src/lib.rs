// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth 2.0 authorization code + PKCE credential core for the labradoc CLI.
//!
//! Obtains an access credential through a loopback browser redirect (or a
//! two-step headless flow), persists it under the user's config directory,
//! and refreshes it on demand.

pub mod api;
pub mod callback;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod login;
pub mod pkce;
pub mod store;

#[cfg(test)]
mod test_support;

use std::sync::Once;

pub use api::{ApiAuth, ApiClient};
pub use callback::{CallbackListener, Redirect};
pub use clock::{Clock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, StoreError};
pub use exchange::TokenClient;
pub use login::{AuthorizationRequest, InteractiveLogin, LoginPhase, ManualExchange};
pub use pkce::PkcePair;
pub use store::{PendingSession, Token, TokenStore};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Idempotent; only the first call installs the provider.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
