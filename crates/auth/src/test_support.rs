// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for unit tests: a scripted mock token endpoint.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::AuthConfig;

/// A request captured by [`MockTokenServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub content_type: String,
    pub accept: String,
    pub form: HashMap<String, String>,
}

/// Mock Keycloak token endpoint replaying scripted `(status, body)` responses.
///
/// Once the script runs out, the last response repeats.
pub struct MockTokenServer {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockTokenServer {
    pub async fn start(responses: Vec<(u16, String)>) -> anyhow::Result<Self> {
        let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::default();
        let captured = Arc::clone(&requests);
        let responses = Arc::new(responses);

        let app = Router::new().route(
            "/realms/test/protocol/openid-connect/token",
            post(move |headers: HeaderMap, body: String| {
                let captured = Arc::clone(&captured);
                let resps = Arc::clone(&responses);
                async move {
                    let header = |name: &str| {
                        headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("").to_owned()
                    };
                    let form = url::form_urlencoded::parse(body.as_bytes()).into_owned().collect();
                    let idx = {
                        let mut reqs = captured.lock().unwrap_or_else(|e| e.into_inner());
                        reqs.push(CapturedRequest {
                            content_type: header("content-type"),
                            accept: header("accept"),
                            form,
                        });
                        reqs.len() - 1
                    };
                    let (status, body) = resps
                        .get(idx)
                        .or_else(|| resps.last())
                        .cloned()
                        .unwrap_or((500, "{}".to_owned()));
                    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), body)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, requests })
    }

    /// Provider config pointing at this server's `test` realm.
    pub fn config(&self) -> AuthConfig {
        AuthConfig::new(format!("http://{}", self.addr), "test", "cli-client")
    }

    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
