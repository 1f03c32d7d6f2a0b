// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Back-channel requests to the realm's token endpoint: authorization code
//! exchange and refresh-token grant.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::pkce::token_endpoint;
use crate::store::Token;

/// Upper bound on a single token endpoint round trip.
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the OAuth token endpoint. No retries are performed.
#[derive(Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl TokenClient {
    pub fn new() -> Result<Self, AuthError> {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        crate::ensure_crypto();
        let http = reqwest::Client::builder().timeout(TOKEN_REQUEST_TIMEOUT).build()?;
        Ok(Self { http, clock })
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange_code(
        &self,
        config: &AuthConfig,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<Token, AuthError> {
        if code.is_empty() || redirect_uri.is_empty() || code_verifier.is_empty() {
            return Err(AuthError::InvalidInput(
                "missing code, redirect_uri, or code_verifier".to_owned(),
            ));
        }
        let token = self
            .post_form(
                config,
                &[
                    ("grant_type", "authorization_code"),
                    ("client_id", config.client_id.as_str()),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                    ("code_verifier", code_verifier),
                ],
            )
            .await?;
        tracing::info!(realm = %config.realm, client_id = %config.client_id, "authorization code exchanged");
        Ok(token)
    }

    /// Exchange a refresh token for a new token.
    ///
    /// The provider may omit `refresh_token` from the response; callers keep
    /// the previous one in that case.
    pub async fn refresh(&self, config: &AuthConfig, refresh_token: &str) -> Result<Token, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput("missing refresh_token".to_owned()));
        }
        let token = self
            .post_form(
                config,
                &[
                    ("grant_type", "refresh_token"),
                    ("client_id", config.client_id.as_str()),
                    ("refresh_token", refresh_token),
                ],
            )
            .await?;
        tracing::info!(realm = %config.realm, rotated = token.refresh_token.is_some(), "token refreshed");
        Ok(token)
    }

    async fn post_form(&self, config: &AuthConfig, form: &[(&str, &str)]) -> Result<Token, AuthError> {
        config.validate()?;
        let endpoint = token_endpoint(&config.auth_url, &config.realm)?;
        tracing::debug!(%endpoint, "posting to token endpoint");

        let resp = self
            .http
            .post(endpoint)
            .header(ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status.as_u16() >= 400 {
            return Err(AuthError::Provider { status: status.as_u16(), body: body.trim().to_owned() });
        }

        let mut token: Token = serde_json::from_str(&body).map_err(|e| AuthError::Provider {
            status: status.as_u16(),
            body: format!("unparseable token response ({e}): {}", body.trim()),
        })?;
        if token.access_token.is_empty() {
            return Err(AuthError::Provider {
                status: status.as_u16(),
                body: format!("response missing access_token: {}", body.trim()),
            });
        }

        token.normalize(self.clock.now());
        token.auth_url = Some(config.auth_url.clone());
        token.realm = Some(config.realm.clone());
        token.client_id = Some(config.client_id.clone());
        Ok(token)
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
