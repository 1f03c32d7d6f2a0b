// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::clock::FixedClock;
use crate::test_support::MockTokenServer;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().unwrap_or_default()
}

fn client() -> anyhow::Result<TokenClient> {
    Ok(TokenClient::with_clock(Arc::new(FixedClock(fixed_now())))?)
}

#[tokio::test]
async fn exchange_code_posts_pkce_form() -> anyhow::Result<()> {
    let body = serde_json::json!({
        "access_token": "new-access",
        "refresh_token": "new-refresh",
        "token_type": "Bearer",
        "expires_in": 300,
        "refresh_expires_in": 1800,
        "scope": "openid offline_access",
        "session_state": "ignored"
    });
    let server = MockTokenServer::start(vec![(200, body.to_string())]).await?;
    let config = server.config();

    let token = client()?
        .exchange_code(&config, "the-code", "http://127.0.0.1:5555/callback", "the-verifier")
        .await?;

    assert_eq!(token.access_token, "new-access");
    assert_eq!(token.refresh_token.as_deref(), Some("new-refresh"));
    assert_eq!(token.refresh_expires_in, Some(1800));
    assert_eq!(token.obtained_at, Some(fixed_now()));
    assert_eq!(token.expiry, Some(fixed_now() + Duration::seconds(300)));
    assert_eq!(token.auth_url.as_deref(), Some(config.auth_url.as_str()));
    assert_eq!(token.realm.as_deref(), Some("test"));
    assert_eq!(token.client_id.as_deref(), Some("cli-client"));

    let reqs = server.captured();
    assert_eq!(reqs.len(), 1);
    let req = &reqs[0];
    assert_eq!(req.content_type, "application/x-www-form-urlencoded");
    assert_eq!(req.accept, "application/json");
    assert_eq!(req.form["grant_type"], "authorization_code");
    assert_eq!(req.form["client_id"], "cli-client");
    assert_eq!(req.form["code"], "the-code");
    assert_eq!(req.form["redirect_uri"], "http://127.0.0.1:5555/callback");
    assert_eq!(req.form["code_verifier"], "the-verifier");
    Ok(())
}

#[yare::parameterized(
    no_code     = { "", "http://127.0.0.1/callback", "verifier" },
    no_redirect = { "code", "", "verifier" },
    no_verifier = { "code", "http://127.0.0.1/callback", "" },
)]
#[test_macro(tokio::test)]
async fn exchange_code_rejects_missing_input(code: &str, redirect: &str, verifier: &str) {
    let server = match MockTokenServer::start(vec![(200, "{}".to_owned())]).await {
        Ok(s) => s,
        Err(e) => panic!("mock server: {e}"),
    };
    let client = match client() {
        Ok(c) => c,
        Err(e) => panic!("client: {e}"),
    };
    let result = client.exchange_code(&server.config(), code, redirect, verifier).await;
    assert!(matches!(result, Err(AuthError::InvalidInput(_))), "got {result:?}");
    assert!(server.captured().is_empty(), "no request should be sent");
}

#[tokio::test]
async fn provider_error_carries_response_body() -> anyhow::Result<()> {
    let body = r#"{"error":"invalid_grant","error_description":"Code not valid"}"#;
    let server = MockTokenServer::start(vec![(400, format!("{body}\n"))]).await?;

    let result = client()?.exchange_code(&server.config(), "c", "http://127.0.0.1/cb", "v").await;
    match result {
        Err(AuthError::Provider { status, body: got }) => {
            assert_eq!(status, 400);
            assert_eq!(got, body);
        }
        other => anyhow::bail!("expected provider error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn success_without_access_token_is_provider_error() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, r#"{"token_type":"Bearer"}"#.to_owned())]).await?;
    let result = client()?.refresh(&server.config(), "refresh-1").await;
    assert!(matches!(result, Err(AuthError::Provider { status: 200, .. })), "got {result:?}");
    Ok(())
}

#[tokio::test]
async fn refresh_posts_refresh_grant() -> anyhow::Result<()> {
    let server =
        MockTokenServer::start(vec![(200, r#"{"access_token":"fresh","expires_in":60}"#.to_owned())])
            .await?;

    let token = client()?.refresh(&server.config(), "old-refresh").await?;
    assert_eq!(token.access_token, "fresh");
    assert_eq!(token.refresh_token, None, "exchanger reports what the provider sent");
    assert_eq!(token.expiry, Some(fixed_now() + Duration::seconds(60)));

    let reqs = server.captured();
    assert_eq!(reqs[0].form["grant_type"], "refresh_token");
    assert_eq!(reqs[0].form["client_id"], "cli-client");
    assert_eq!(reqs[0].form["refresh_token"], "old-refresh");
    assert!(!reqs[0].form.contains_key("code_verifier"));
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_empty_token() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, "{}".to_owned())]).await?;
    let result = client()?.refresh(&server.config(), "").await;
    assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    assert!(server.captured().is_empty());
    Ok(())
}

#[tokio::test]
async fn provider_expiry_is_kept() -> anyhow::Result<()> {
    let body = r#"{"access_token":"a","expires_in":60,"expiry":"2030-01-01T00:00:00Z"}"#;
    let server = MockTokenServer::start(vec![(200, body.to_owned())]).await?;
    let token = client()?.refresh(&server.config(), "r").await?;
    assert_eq!(token.expiry, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single());
    Ok(())
}

#[tokio::test]
async fn missing_config_is_rejected_before_request() -> anyhow::Result<()> {
    let config = AuthConfig::new("http://127.0.0.1:1", "", "cli");
    let result = client()?.refresh(&config, "r").await;
    assert!(matches!(result, Err(AuthError::Config("realm"))), "got {result:?}");
    Ok(())
}
