// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::error::AuthError;

/// Default wait for the browser redirect during interactive login.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Default redirect URI for the two-step (headless) flow.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:18080/callback";

/// Identity provider coordinates for one login/refresh operation.
///
/// Passed explicitly into every operation; nothing here is process-global.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// Keycloak base URL, e.g. `https://auth.labradoc.eu`.
    pub auth_url: String,
    pub realm: String,
    pub client_id: String,
    /// Space-separated OAuth scopes. Empty omits the parameter.
    pub scope: String,
    /// API base URL stamped onto new credentials, when known.
    pub api_url: Option<String>,
}

impl AuthConfig {
    pub fn new(
        auth_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            realm: realm.into(),
            client_id: client_id.into(),
            scope: String::new(),
            api_url: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Reject empty provider coordinates, naming the first missing one.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.auth_url.trim().is_empty() {
            return Err(AuthError::Config("auth_url"));
        }
        if self.realm.trim().is_empty() {
            return Err(AuthError::Config("realm"));
        }
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Config("client_id"));
        }
        Ok(())
    }

    /// API base URL, if configured and non-empty.
    pub fn resolved_api_url(&self) -> Option<&str> {
        self.api_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}
