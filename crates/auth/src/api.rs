// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP client for the labradoc API.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};

use crate::error::AuthError;
use crate::store::Token;

/// Default per-request timeout for API calls.
pub const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the token validation endpoint.
pub const VALIDATE_PATH: &str = "/api/validate";

/// How outbound API requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum ApiAuth {
    /// `Authorization: Bearer {access_token}`.
    Bearer(String),
    /// `X-API-Key: {key}`; wins over a stored credential when configured.
    ApiKey(String),
}

impl std::fmt::Debug for ApiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

impl ApiAuth {
    /// Pick the API key when one is set, otherwise the credential's access token.
    pub fn resolve(api_key: Option<&str>, token: Option<&Token>) -> Option<Self> {
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            return Some(Self::ApiKey(key.to_owned()));
        }
        token
            .map(|t| t.access_token.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| Self::Bearer(t.to_owned()))
    }

    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => req.bearer_auth(token),
            Self::ApiKey(key) => req.header("X-API-Key", key),
        }
    }
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    auth: Option<ApiAuth>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        auth: Option<ApiAuth>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(AuthError::Config("api_url"));
        }
        crate::ensure_crypto();
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, auth, http })
    }

    /// Client authenticating with the stored credential's access token.
    pub fn from_token(base_url: impl Into<String>, token: &Token) -> Result<Self, AuthError> {
        Self::new(base_url, ApiAuth::resolve(None, Some(token)), API_REQUEST_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join the base URL and `path`, inserting exactly one `/` between them.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start an authenticated request to `path`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, self.url(path));
        match &self.auth {
            Some(auth) => auth.apply(req),
            None => req,
        }
    }

    /// Check the configured credential against the API.
    ///
    /// Status >= 400 is `AuthError::Api` carrying the response body.
    pub async fn validate(&self) -> Result<(), AuthError> {
        let resp = self.request(Method::GET, VALIDATE_PATH).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if status >= 400 {
            tracing::debug!(status, "credential rejected by API");
            return Err(AuthError::Api { status, body: body.trim().to_owned() });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
