// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence: token and pending PKCE session as JSON files in a
//! private per-user directory, written atomically with owner-only permissions.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;

const TOKEN_FILE_NAME: &str = "token.json";
const PENDING_FILE_NAME: &str = "pkce.json";

/// The persisted OAuth credential.
///
/// Also the shape of the token endpoint's JSON response; provider fields the
/// client does not know about are ignored.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds, as reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obtained_at: Option<DateTime<Utc>>,
    /// Identity provider coordinates this token was issued by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl Token {
    /// Backfill `obtained_at` (now) and `expiry` (`obtained_at + expires_in`)
    /// when the provider did not supply them.
    pub fn normalize(&mut self, now: DateTime<Utc>) {
        let obtained_at = *self.obtained_at.get_or_insert(now);
        if self.expiry.is_none() {
            self.expiry = self
                .expires_in
                .filter(|s| *s > 0)
                .and_then(Duration::try_seconds)
                .and_then(|ttl| obtained_at.checked_add_signed(ttl));
        }
    }

    /// Whether the access token has expired at `now`. Tokens without an
    /// expiry are treated as live.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|exp| exp <= now)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("expiry", &self.expiry)
            .field("obtained_at", &self.obtained_at)
            .field("auth_url", &self.auth_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// In-flight authorization for the two-step flow, persisted between the
/// process that printed the URL and the one that exchanges the code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSession {
    #[serde(default)]
    pub code_verifier: String,
    #[serde(default)]
    pub code_challenge: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PendingSession {
    /// Age of the session at `now`, if its creation time is known.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.created_at.map(|created| now - created)
    }
}

impl std::fmt::Debug for PendingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSession")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .field("state", &self.state)
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Resolve the config directory for CLI state.
///
/// Checks `LABRADOC_CONFIG_DIR`, then `$XDG_CONFIG_HOME/labradoc/cli`,
/// then `$HOME/.config/labradoc/cli`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = non_empty_env("LABRADOC_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty_env("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("labradoc/cli"));
    }
    non_empty_env("HOME").map(|home| PathBuf::from(home).join(".config/labradoc/cli"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// File-backed store for the credential and the pending PKCE session.
#[derive(Clone)]
pub struct TokenStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").field("dir", &self.dir).finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self { dir: dir.into(), clock }
    }

    /// Open the store in the default per-user config directory.
    pub fn open_default() -> Result<Self, StoreError> {
        config_dir().map(Self::new).ok_or(StoreError::NoConfigDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current time according to this store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE_NAME)
    }

    pub fn pending_path(&self) -> PathBuf {
        self.dir.join(PENDING_FILE_NAME)
    }

    /// Load the stored credential.
    ///
    /// A missing file is `NotFound`; an unparseable file or an empty
    /// `access_token` is `Corrupt`.
    pub fn load(&self) -> Result<Token, StoreError> {
        let path = self.token_path();
        let token: Token = read_json(&path)?;
        if token.access_token.is_empty() {
            return Err(StoreError::Corrupt { path, reason: "missing access_token".to_owned() });
        }
        Ok(token)
    }

    /// Persist `token`, overwriting any previous credential.
    pub fn save(&self, token: &Token) -> Result<(), StoreError> {
        let mut token = token.clone();
        token.normalize(self.clock.now());
        write_json(&self.dir, &self.token_path(), &token)?;
        tracing::debug!(path = %self.token_path().display(), "credential saved");
        Ok(())
    }

    /// Delete the stored credential. Succeeds if none exists.
    pub fn clear(&self) -> Result<(), StoreError> {
        remove_if_exists(&self.token_path())
    }

    /// Load the pending session. Corrupt if `code_verifier` or `redirect_uri`
    /// is empty.
    pub fn load_pending_session(&self) -> Result<PendingSession, StoreError> {
        let path = self.pending_path();
        let session: PendingSession = read_json(&path)?;
        if session.code_verifier.is_empty() || session.redirect_uri.is_empty() {
            return Err(StoreError::Corrupt {
                path,
                reason: "pending session missing code_verifier or redirect_uri".to_owned(),
            });
        }
        Ok(session)
    }

    pub fn save_pending_session(&self, session: &PendingSession) -> Result<(), StoreError> {
        let mut session = session.clone();
        session.created_at.get_or_insert_with(|| self.clock.now());
        write_json(&self.dir, &self.pending_path(), &session)
    }

    /// Delete the pending session. Succeeds if none exists.
    pub fn clear_pending_session(&self) -> Result<(), StoreError> {
        remove_if_exists(&self.pending_path())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound { path: path.to_owned() });
        }
        Err(source) => return Err(StoreError::Io { path: path.to_owned(), source }),
    };
    serde_json::from_str(&contents)
        .map_err(|e| StoreError::Corrupt { path: path.to_owned(), reason: e.to_string() })
}

/// Write `value` as pretty JSON atomically (unique tmp file + rename), with
/// the directory `0700` and the file `0600` on Unix.
fn write_json<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), StoreError> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let io_err = |source| StoreError::Io { path: path.to_owned(), source };

    create_private_dir(dir).map_err(|source| StoreError::Io { path: dir.to_owned(), source })?;

    let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Io {
        path: path.to_owned(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| {
        let mut file = open_private(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result.map_err(io_err)
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io { path: path.to_owned(), source }),
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
