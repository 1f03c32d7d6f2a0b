// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use labradoc_auth::{AuthConfig, TokenStore};

use crate::command::auth::AuthArgs;

/// Command-line client for the labradoc API.
#[derive(Debug, Parser)]
#[command(name = "labradoc", version, about)]
pub struct Cli {
    /// Keycloak base URL.
    #[arg(long, global = true, env = "LABRADOC_AUTH_URL", default_value = "https://auth.labradoc.eu")]
    pub auth_url: String,

    /// Keycloak realm.
    #[arg(long, global = true, env = "LABRADOC_REALM", default_value = "labradoc")]
    pub realm: String,

    /// OAuth client id.
    #[arg(long, global = true, env = "LABRADOC_CLIENT_ID", default_value = "labradoc-openclaw")]
    pub client_id: String,

    /// API base URL.
    #[arg(long, global = true, env = "LABRADOC_API_URL", default_value = "https://labradoc.eu")]
    pub api_url: String,

    /// OAuth scopes, space separated.
    #[arg(
        long,
        global = true,
        env = "LABRADOC_SCOPE",
        default_value = "openid profile email offline_access"
    )]
    pub scope: String,

    /// API key; sent as `X-API-Key` instead of the stored bearer token.
    #[arg(long, global = true, env = "LABRADOC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory holding token.json and pkce.json.
    #[arg(long, global = true, env = "LABRADOC_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log format (text or json).
    #[arg(long, global = true, env = "LABRADOC_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level filter.
    #[arg(long, global = true, env = "LABRADOC_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate and manage the stored credential.
    Auth(AuthArgs),
}

impl Cli {
    /// Reject empty provider coordinates and unknown log formats.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (flag, value) in [
            ("--auth-url", &self.auth_url),
            ("--realm", &self.realm),
            ("--client-id", &self.client_id),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{flag} must not be empty");
            }
        }
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid --log-format: {other} (expected text or json)"),
        }
        if let Some(ref dir) = self.config_dir {
            if dir.as_os_str().is_empty() {
                anyhow::bail!("--config-dir must not be empty");
            }
        }
        Ok(())
    }

    pub fn auth_config(&self) -> AuthConfig {
        let mut config =
            AuthConfig::new(self.auth_url.trim(), self.realm.trim(), self.client_id.trim())
                .with_scope(self.scope.trim());
        if !self.api_url.trim().is_empty() {
            config = config.with_api_url(self.api_url.trim());
        }
        config
    }

    /// API key, if configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Open the token store in `--config-dir`, or the default per-user directory.
    pub fn store(&self) -> anyhow::Result<TokenStore> {
        match self.config_dir {
            Some(ref dir) => Ok(TokenStore::new(dir.clone())),
            None => Ok(TokenStore::open_default()?),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
