// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot loopback listener for the browser's authorization redirect.
//!
//! Binds `127.0.0.1:0`, serves `GET /callback?code&state`, hands the first
//! qualifying redirect to the waiting login through a oneshot owned by this
//! listener, then shuts down. Every other path is a 404.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::error::AuthError;

/// Path the authorization server redirects to.
pub const CALLBACK_PATH: &str = "/callback";

/// How long in-flight connections get to drain before the server is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_BODY: &str = "Authentication complete. You can close this window.";

/// Authorization redirect delivered to the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub code: String,
    pub state: Option<String>,
}

type Outcome = Result<Redirect, AuthError>;

struct CallbackState {
    expected_state: String,
    /// Single delivery slot; emptied by the first qualifying redirect.
    slot: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl CallbackState {
    /// Deliver `outcome` if nothing has been delivered yet. Returns whether
    /// this call won the slot.
    fn deliver(&self, outcome: Outcome) -> bool {
        let sender = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

async fn handle_callback(
    State(s): State<Arc<CallbackState>>,
    Query(q): Query<CallbackQuery>,
) -> (StatusCode, String) {
    let Some(code) = q.code.filter(|c| !c.is_empty()) else {
        // Keep waiting: a stray or malformed request must not abort a live login.
        let body = match (q.error, q.error_description) {
            (Some(err), Some(desc)) => format!("Authorization failed: {err}: {desc}"),
            (Some(err), None) => format!("Authorization failed: {err}"),
            _ => "Missing code".to_owned(),
        };
        tracing::warn!(%body, "callback without authorization code");
        return (StatusCode::BAD_REQUEST, body);
    };

    if !s.expected_state.is_empty() {
        let received = q.state.clone().unwrap_or_default();
        if !constant_time_eq(&received, &s.expected_state) {
            let delivered = s.deliver(Err(AuthError::StateMismatch {
                expected: s.expected_state.clone(),
                received,
            }));
            tracing::warn!(delivered, "callback state mismatch");
            return (StatusCode::BAD_REQUEST, "State mismatch".to_owned());
        }
    }

    let delivered = s.deliver(Ok(Redirect { code, state: q.state }));
    if delivered {
        tracing::info!("authorization code received");
    } else {
        tracing::debug!("duplicate callback ignored");
    }
    (StatusCode::OK, SUCCESS_BODY.to_owned())
}

fn build_router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Constant-time string comparison to prevent timing side-channel attacks.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// A bound loopback listener waiting for exactly one authorization redirect.
///
/// The socket is released when [`wait`](Self::wait) returns or when the
/// listener is dropped.
pub struct CallbackListener {
    addr: SocketAddr,
    result_rx: oneshot::Receiver<Outcome>,
    shutdown: CancellationToken,
    server: Option<JoinHandle<std::io::Result<()>>>,
}

impl CallbackListener {
    /// Bind an OS-assigned port on `127.0.0.1` and start serving.
    ///
    /// An empty `expected_state` disables the state check entirely: any
    /// redirect carrying a code is accepted. Callers that want CSRF
    /// protection must pass the state they put in the authorization URL.
    pub async fn bind(expected_state: impl Into<String>) -> Result<Self, AuthError> {
        let listener =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.map_err(AuthError::Listener)?;
        let addr = listener.local_addr().map_err(AuthError::Listener)?;

        let (tx, result_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            expected_state: expected_state.into(),
            slot: Mutex::new(Some(tx)),
        });
        let router = build_router(state);

        let shutdown = CancellationToken::new();
        let sd = shutdown.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).with_graceful_shutdown(sd.cancelled_owned()).await
        });
        tracing::debug!(%addr, "callback listener bound");

        Ok(Self { addr, result_rx, shutdown, server: Some(server) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Redirect URI embedding the bound port.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{CALLBACK_PATH}", self.addr.port())
    }

    /// Wait for the redirect, a server failure, or the deadline, whichever
    /// comes first. A redirect that has already been delivered always wins.
    pub async fn wait(mut self, deadline: Duration) -> Result<Redirect, AuthError> {
        let Some(mut server) = self.server.take() else {
            return Err(listener_gone());
        };

        let mut server_done = false;
        let outcome = tokio::select! {
            biased;
            result = &mut self.result_rx => result.unwrap_or_else(|_| Err(listener_gone())),
            joined = &mut server => {
                server_done = true;
                Err(AuthError::Listener(match joined {
                    Ok(Ok(())) => std::io::Error::other("callback server exited early"),
                    Ok(Err(e)) => e,
                    Err(e) => std::io::Error::other(e),
                }))
            }
            () = tokio::time::sleep(deadline) => Err(AuthError::Timeout(deadline)),
        };

        self.shutdown.cancel();
        if !server_done && tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            server.abort();
            let _ = server.await;
        }
        tracing::debug!(addr = %self.addr, ok = outcome.is_ok(), "callback listener closed");
        outcome
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

fn listener_gone() -> AuthError {
    AuthError::Listener(std::io::Error::other("callback server stopped before a redirect arrived"))
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
