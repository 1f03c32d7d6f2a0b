// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use super::*;

#[yare::parameterized(
    config = { AuthError::Config("realm"), "missing auth configuration: realm" },
    mismatch = {
        AuthError::StateMismatch { expected: "abc".into(), received: "xyz".into() },
        "state mismatch: expected \"abc\", got \"xyz\""
    },
    provider = {
        AuthError::Provider { status: 400, body: "{\"error\":\"invalid_grant\"}".into() },
        "token endpoint returned 400: {\"error\":\"invalid_grant\"}"
    },
    api = { AuthError::Api { status: 401, body: "unauthorized".into() }, "API returned 401: unauthorized" },
    no_refresh = { AuthError::NoRefreshToken, "no refresh_token available" },
)]
fn display_names_the_problem(err: AuthError, expected: &str) {
    assert_eq!(err.to_string(), expected);
}

#[test]
fn timeout_is_retryable_but_mismatch_is_not() {
    assert!(AuthError::Timeout(Duration::from_secs(2)).is_retryable());
    assert!(!AuthError::StateMismatch { expected: "a".into(), received: "b".into() }
        .is_retryable());
    assert!(!AuthError::Config("client_id").is_retryable());
}

#[test]
fn store_error_kinds_are_distinct() {
    let missing = StoreError::NotFound { path: PathBuf::from("/tmp/token.json") };
    let corrupt =
        StoreError::Corrupt { path: PathBuf::from("/tmp/token.json"), reason: "empty".into() };
    assert!(missing.is_not_found() && !missing.is_corrupt());
    assert!(corrupt.is_corrupt() && !corrupt.is_not_found());
}

#[test]
fn store_error_converts_transparently() {
    let err: AuthError = StoreError::NotFound { path: PathBuf::from("/x/token.json") }.into();
    assert_eq!(err.to_string(), "no stored credential at /x/token.json");
}
