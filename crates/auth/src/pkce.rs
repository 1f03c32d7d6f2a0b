// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth authorization code + PKCE (RFC 7636) helpers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::AuthError;

/// Raw random bytes behind a code verifier (86 chars once encoded).
const VERIFIER_BYTES: usize = 64;

/// Raw random bytes behind a `state` parameter (43 chars once encoded).
const STATE_BYTES: usize = 32;

/// A code verifier and its S256 challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Generate a fresh verifier/challenge pair from the OS random source.
pub fn generate() -> Result<PkcePair, AuthError> {
    let verifier = random_token::<VERIFIER_BYTES>()?;
    let challenge = compute_code_challenge(&verifier);
    Ok(PkcePair { verifier, challenge })
}

/// Compute code_challenge = base64url_nopad(sha256(verifier)).
pub fn compute_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate an unguessable `state` parameter for CSRF protection.
pub fn generate_state() -> Result<String, AuthError> {
    random_token::<STATE_BYTES>()
}

fn random_token<const N: usize>() -> Result<String, AuthError> {
    let mut bytes = [0u8; N];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| AuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Build the Keycloak authorization URL with PKCE parameters.
///
/// `scope`, `state`, and `code_challenge` are only added when non-empty.
pub fn build_auth_url(
    auth_url: &str,
    realm: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
    code_challenge: &str,
) -> Result<Url, AuthError> {
    let mut url = realm_url(auth_url, realm, "auth")?;
    if client_id.is_empty() {
        return Err(AuthError::Config("client_id"));
    }
    if redirect_uri.is_empty() {
        return Err(AuthError::Config("redirect_uri"));
    }
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("client_id", client_id);
        q.append_pair("response_type", "code");
        q.append_pair("redirect_uri", redirect_uri);
        if !scope.is_empty() {
            q.append_pair("scope", scope);
        }
        if !state.is_empty() {
            q.append_pair("state", state);
        }
        if !code_challenge.is_empty() {
            q.append_pair("code_challenge_method", "S256");
            q.append_pair("code_challenge", code_challenge);
        }
    }
    Ok(url)
}

/// The realm's token endpoint, used for code exchange and refresh.
pub fn token_endpoint(auth_url: &str, realm: &str) -> Result<Url, AuthError> {
    realm_url(auth_url, realm, "token")
}

fn realm_url(auth_url: &str, realm: &str, endpoint: &str) -> Result<Url, AuthError> {
    if auth_url.is_empty() {
        return Err(AuthError::Config("auth_url"));
    }
    if realm.is_empty() {
        return Err(AuthError::Config("realm"));
    }
    let base = auth_url.trim_end_matches('/');
    let url = Url::parse(&format!("{base}/realms/{realm}/protocol/openid-connect/{endpoint}"))?;
    Ok(url)
}

#[cfg(test)]
#[path = "pkce_tests.rs"]
mod tests;
