// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login orchestration: interactive loopback login, the two-step headless
//! flow, and refresh of the stored credential.

use std::time::Duration;

use url::Url;

use crate::callback::{constant_time_eq, CallbackListener};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::exchange::TokenClient;
use crate::pkce::{self, build_auth_url, PkcePair};
use crate::store::{PendingSession, Token, TokenStore};

/// Pending sessions older than this are discarded instead of exchanged.
pub const PENDING_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Phase of an interactive login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    Init,
    AwaitingRedirect,
    Exchanging,
    Done,
    Failed,
}

impl LoginPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::AwaitingRedirect => "awaiting_redirect",
            Self::Exchanging => "exchanging",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LoginPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An interactive login with its loopback listener already bound.
///
/// Created by [`start`](Self::start); the caller shows
/// [`authorization_url`](Self::authorization_url) to the user and then
/// drives the rest with [`complete`](Self::complete).
pub struct InteractiveLogin {
    config: AuthConfig,
    pkce: PkcePair,
    state: String,
    listener: CallbackListener,
    url: Url,
    phase: LoginPhase,
}

impl std::fmt::Debug for InteractiveLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveLogin")
            .field("redirect_uri", &self.listener.redirect_uri())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl InteractiveLogin {
    /// Generate PKCE material and state, bind the listener, and build the
    /// authorization URL.
    pub async fn start(config: &AuthConfig) -> Result<Self, AuthError> {
        enter(LoginPhase::Init);
        let prepared = async {
            config.validate()?;
            let pkce = pkce::generate()?;
            let state = pkce::generate_state()?;
            let listener = CallbackListener::bind(state.clone()).await?;
            let url = build_auth_url(
                &config.auth_url,
                &config.realm,
                &config.client_id,
                &listener.redirect_uri(),
                &config.scope,
                &state,
                &pkce.challenge,
            )?;
            Ok::<_, AuthError>((pkce, state, listener, url))
        }
        .await;

        let (pkce, state, listener, url) = prepared.inspect_err(fail)?;
        enter(LoginPhase::AwaitingRedirect);
        Ok(Self {
            config: config.clone(),
            pkce,
            state,
            listener,
            url,
            phase: LoginPhase::AwaitingRedirect,
        })
    }

    pub fn authorization_url(&self) -> &Url {
        &self.url
    }

    pub fn redirect_uri(&self) -> String {
        self.listener.redirect_uri()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    /// Wait for the redirect, exchange the code, and persist the credential.
    ///
    /// The listener is released before the exchange starts. On any failure
    /// the store is left untouched.
    pub async fn complete(
        self,
        client: &TokenClient,
        store: &TokenStore,
        deadline: Duration,
    ) -> Result<Token, AuthError> {
        let Self { config, pkce, listener, .. } = self;
        let redirect_uri = listener.redirect_uri();

        let redirect = listener.wait(deadline).await.inspect_err(fail)?;

        enter(LoginPhase::Exchanging);
        let mut token = client
            .exchange_code(&config, &redirect.code, &redirect_uri, &pkce.verifier)
            .await
            .inspect_err(fail)?;
        stamp_api_url(&mut token, &config);
        store.save(&token).map_err(AuthError::from).inspect_err(fail)?;

        enter(LoginPhase::Done);
        Ok(token)
    }
}

/// Authorization request produced by the first step of the two-step flow.
#[derive(Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("url", &self.url.as_str())
            .field("state", &self.state)
            .field("code_verifier", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Build an authorization URL for a fixed `redirect_uri` and persist the
/// pending session so a later invocation can exchange the code.
pub fn begin_pending(
    config: &AuthConfig,
    redirect_uri: &str,
    store: &TokenStore,
) -> Result<AuthorizationRequest, AuthError> {
    config.validate()?;
    let pkce = pkce::generate()?;
    let state = pkce::generate_state()?;
    let url = build_auth_url(
        &config.auth_url,
        &config.realm,
        &config.client_id,
        redirect_uri,
        &config.scope,
        &state,
        &pkce.challenge,
    )?;

    store.save_pending_session(&PendingSession {
        code_verifier: pkce.verifier.clone(),
        code_challenge: pkce.challenge.clone(),
        state: state.clone(),
        redirect_uri: redirect_uri.to_owned(),
        scope: config.scope.clone(),
        created_at: None,
    })?;
    tracing::info!(%redirect_uri, "pending authorization session saved");

    Ok(AuthorizationRequest {
        url,
        state,
        code_verifier: pkce.verifier,
        code_challenge: pkce.challenge,
        redirect_uri: redirect_uri.to_owned(),
        scope: config.scope.clone(),
    })
}

/// Manually supplied second step of the two-step flow.
///
/// Fields left `None` (or empty) are filled from the persisted pending
/// session.
#[derive(Clone, Default)]
pub struct ManualExchange {
    pub code: String,
    pub state: Option<String>,
    pub code_verifier: Option<String>,
    pub redirect_uri: Option<String>,
}

impl std::fmt::Debug for ManualExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualExchange")
            .field("code", &"<redacted>")
            .field("state", &self.state)
            .field("code_verifier", &self.code_verifier.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Exchange a pasted authorization code, completing a session started with
/// [`begin_pending`].
///
/// The pending session is consulted when the verifier or redirect URI is
/// missing, or when a state was supplied to check against. A supplied state
/// that differs from the persisted one is a hard `StateMismatch`. Sessions
/// older than [`PENDING_SESSION_TTL`] are cleared and rejected.
pub async fn complete_pending(
    config: &AuthConfig,
    client: &TokenClient,
    store: &TokenStore,
    input: ManualExchange,
) -> Result<Token, AuthError> {
    let code = input.code.trim();
    if code.is_empty() {
        return Err(AuthError::InvalidInput("missing authorization code".to_owned()));
    }
    let state = non_empty(input.state);
    let mut verifier = non_empty(input.code_verifier);
    let mut redirect_uri = non_empty(input.redirect_uri);

    if verifier.is_none() || redirect_uri.is_none() || state.is_some() {
        if let Some(session) = load_fresh_session(store)? {
            if let Some(received) = &state {
                if !session.state.is_empty() && !constant_time_eq(received, &session.state) {
                    return Err(AuthError::StateMismatch {
                        expected: session.state,
                        received: received.clone(),
                    });
                }
            }
            verifier.get_or_insert(session.code_verifier);
            redirect_uri.get_or_insert(session.redirect_uri);
        }
    }

    let (Some(verifier), Some(redirect_uri)) = (verifier, redirect_uri) else {
        return Err(AuthError::InvalidInput(
            "no pending session; code_verifier and redirect_uri are required".to_owned(),
        ));
    };

    let mut token = client.exchange_code(config, code, &redirect_uri, &verifier).await?;
    stamp_api_url(&mut token, config);
    store.save(&token)?;
    store.clear_pending_session()?;
    tracing::info!("pending session exchanged");
    Ok(token)
}

/// Refresh the stored credential and persist the result.
///
/// The endpoint coordinates stamped on the stored credential win over
/// `config`. A response without a `refresh_token` keeps the previous one.
pub async fn refresh_stored(
    config: &AuthConfig,
    client: &TokenClient,
    store: &TokenStore,
) -> Result<Token, AuthError> {
    let current = store.load()?;
    let refresh_token = current
        .refresh_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::NoRefreshToken)?;

    let endpoint = endpoint_for(config, &current);
    let mut token = client.refresh(&endpoint, &refresh_token).await?;
    if token.refresh_token.as_deref().unwrap_or_default().is_empty() {
        token.refresh_token = Some(refresh_token);
    }
    if token.api_url.is_none() {
        token.api_url = current.api_url.or_else(|| config.resolved_api_url().map(str::to_owned));
    }
    store.save(&token)?;
    Ok(token)
}

fn load_fresh_session(store: &TokenStore) -> Result<Option<PendingSession>, AuthError> {
    let session = match store.load_pending_session() {
        Ok(s) => s,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let ttl = chrono::Duration::from_std(PENDING_SESSION_TTL).unwrap_or(chrono::Duration::MAX);
    if let Some(age) = session.age(store.now()) {
        if age > ttl {
            store.clear_pending_session()?;
            tracing::warn!(age_secs = age.num_seconds(), "discarded stale pending session");
            return Err(AuthError::StaleSession { age_secs: age.num_seconds() });
        }
    }
    Ok(Some(session))
}

fn endpoint_for(config: &AuthConfig, token: &Token) -> AuthConfig {
    let pick = |stamped: &Option<String>, fallback: &str| {
        stamped.as_deref().filter(|s| !s.is_empty()).unwrap_or(fallback).to_owned()
    };
    AuthConfig {
        auth_url: pick(&token.auth_url, &config.auth_url),
        realm: pick(&token.realm, &config.realm),
        client_id: pick(&token.client_id, &config.client_id),
        ..config.clone()
    }
}

fn stamp_api_url(token: &mut Token, config: &AuthConfig) {
    if let Some(api_url) = config.resolved_api_url() {
        token.api_url = Some(api_url.to_owned());
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn enter(phase: LoginPhase) {
    tracing::info!(%phase, "login phase");
}

fn fail(err: &AuthError) {
    tracing::warn!(phase = %LoginPhase::Failed, err = %err, "login failed");
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
