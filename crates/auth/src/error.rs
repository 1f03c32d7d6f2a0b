// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Errors surfaced by the credential core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Required configuration (base URL, realm, client id, redirect URI) is missing.
    #[error("missing auth configuration: {0}")]
    Config(&'static str),

    /// A caller-supplied argument is missing or empty. No request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The redirect (or a caller-supplied state) does not match the expected state.
    #[error("state mismatch: expected {expected:?}, got {received:?}")]
    StateMismatch { expected: String, received: String },

    /// The persisted pending session is older than the allowed window.
    #[error("pending authorization session is stale (started {age_secs}s ago), run `auth url` again")]
    StaleSession { age_secs: i64 },

    /// No redirect arrived before the deadline.
    #[error("timed out after {0:?} waiting for authentication")]
    Timeout(Duration),

    /// The token endpoint rejected the request.
    #[error("token endpoint returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// The API rejected an authenticated request.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The stored credential cannot be refreshed.
    #[error("no refresh_token available")]
    NoRefreshToken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The local callback listener failed to bind or serve.
    #[error("callback listener failed: {0}")]
    Listener(#[source] std::io::Error),

    /// The OS random source could not be read.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Whether a fresh attempt may succeed without changing configuration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Http(_) | Self::StaleSession { .. })
    }
}

/// Errors from the on-disk token store.
///
/// `NotFound` means "never logged in"; `Corrupt` means the stored state is
/// damaged and a fresh login is required.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no stored credential at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("stored data at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No config directory could be resolved from the environment.
    #[error("cannot resolve config directory (set LABRADOC_CONFIG_DIR or HOME)")]
    NoConfigDir,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
