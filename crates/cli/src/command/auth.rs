// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `labradoc auth`: obtain, inspect, refresh, and remove the stored credential.

use std::time::Duration;

use chrono::{DateTime, Utc};
use labradoc_auth::api::{ApiAuth, ApiClient, API_REQUEST_TIMEOUT};
use labradoc_auth::config::DEFAULT_REDIRECT_URI;
use labradoc_auth::login::{begin_pending, complete_pending, refresh_stored, AuthorizationRequest};
use labradoc_auth::{AuthConfig, AuthError, InteractiveLogin, ManualExchange, Token, TokenClient};
use serde::Serialize;

use crate::config::Cli;

/// CLI arguments for `labradoc auth`.
#[derive(Debug, clap::Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum AuthCommand {
    /// Log in through the browser using a local callback.
    Login(LoginArgs),
    /// Print an authorization URL and save the PKCE session for `exchange`.
    Url(UrlArgs),
    /// Exchange an authorization code for a token.
    Exchange(ExchangeArgs),
    /// Print the stored access token.
    Token(JsonArgs),
    /// Refresh the stored access token.
    Refresh(JsonArgs),
    /// Validate the stored token against the API.
    Status,
    /// Remove the stored token.
    Logout,
}

#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Seconds to wait for the browser redirect.
    #[arg(long, default_value = "120")]
    pub timeout: u64,
    /// Output machine-readable JSON (the URL goes to stderr).
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct UrlArgs {
    /// Redirect URI registered for the client.
    #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
    pub redirect_uri: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ExchangeArgs {
    /// Authorization code from the redirect.
    #[arg(long)]
    pub code: String,
    /// PKCE code verifier (defaults to the saved session).
    #[arg(long)]
    pub code_verifier: Option<String>,
    /// Redirect URI used in authorization (defaults to the saved session).
    #[arg(long)]
    pub redirect_uri: Option<String>,
    /// State returned with the code; checked against the saved session.
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct JsonArgs {
    /// Output machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

/// Result of a command that saved a credential.
#[derive(Debug, Serialize)]
pub struct SavedOutput<'a> {
    pub status: &'static str,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<&'a str>,
}

impl<'a> SavedOutput<'a> {
    pub fn from_token(token: &'a Token) -> Self {
        Self { status: "ok", expires_at: token.expiry, scope: token.scope.as_deref() }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenOutput<'a> {
    pub access_token: &'a str,
    pub token_type: Option<&'a str>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<&'a str>,
}

impl<'a> TokenOutput<'a> {
    pub fn from_token(token: &'a Token) -> Self {
        Self {
            access_token: &token.access_token,
            token_type: token.token_type.as_deref(),
            expires_at: token.expiry,
            scope: token.scope.as_deref(),
        }
    }
}

/// Everything a headless caller needs to finish the two-step flow.
#[derive(Debug, Serialize)]
pub struct UrlOutput<'a> {
    pub authorization_url: &'a str,
    pub state: &'a str,
    pub redirect_uri: &'a str,
    pub client_id: &'a str,
    pub realm: &'a str,
    pub auth_url: &'a str,
    pub scope: &'a str,
    pub code_verifier: &'a str,
    pub code_challenge: &'a str,
}

impl<'a> UrlOutput<'a> {
    pub fn new(config: &'a AuthConfig, req: &'a AuthorizationRequest) -> Self {
        Self {
            authorization_url: req.url.as_str(),
            state: &req.state,
            redirect_uri: &req.redirect_uri,
            client_id: &config.client_id,
            realm: &config.realm,
            auth_url: &config.auth_url,
            scope: &req.scope,
            code_verifier: &req.code_verifier,
            code_challenge: &req.code_challenge,
        }
    }
}

/// Run the `labradoc auth` subcommand.
pub async fn run(cli: &Cli, args: &AuthArgs) -> anyhow::Result<()> {
    match args.command {
        AuthCommand::Login(ref a) => cmd_login(cli, a).await,
        AuthCommand::Url(ref a) => cmd_url(cli, a),
        AuthCommand::Exchange(ref a) => cmd_exchange(cli, a).await,
        AuthCommand::Token(ref a) => cmd_token(cli, a),
        AuthCommand::Refresh(ref a) => cmd_refresh(cli, a).await,
        AuthCommand::Status => cmd_status(cli).await,
        AuthCommand::Logout => cmd_logout(cli),
    }
}

async fn cmd_login(cli: &Cli, args: &LoginArgs) -> anyhow::Result<()> {
    let config = cli.auth_config();
    let store = cli.store()?;
    let client = TokenClient::new()?;

    let login = InteractiveLogin::start(&config).await?;
    let prompt = format!("Open this URL to authenticate:\n{}", login.authorization_url());
    if args.json {
        eprintln!("{prompt}");
    } else {
        println!("{prompt}");
    }

    let deadline = Duration::from_secs(args.timeout);
    let token = tokio::select! {
        result = login.complete(&client, &store, deadline) => result?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("login interrupted"),
    };
    print_saved(&token, args.json)
}

fn cmd_url(cli: &Cli, args: &UrlArgs) -> anyhow::Result<()> {
    let config = cli.auth_config();
    let req = begin_pending(&config, args.redirect_uri.trim(), &cli.store()?)?;
    if args.json {
        println!("{}", serde_json::to_string(&UrlOutput::new(&config, &req))?);
    } else {
        println!("Authorization URL:\n{}", req.url);
        println!("Code verifier (store securely):\n{}", req.code_verifier);
    }
    Ok(())
}

async fn cmd_exchange(cli: &Cli, args: &ExchangeArgs) -> anyhow::Result<()> {
    let input = ManualExchange {
        code: args.code.clone(),
        state: args.state.clone(),
        code_verifier: args.code_verifier.clone(),
        redirect_uri: args.redirect_uri.clone(),
    };
    let token =
        complete_pending(&cli.auth_config(), &TokenClient::new()?, &cli.store()?, input).await?;
    print_saved(&token, args.json)
}

fn cmd_token(cli: &Cli, args: &JsonArgs) -> anyhow::Result<()> {
    let token = cli.store()?.load()?;
    if args.json {
        println!("{}", serde_json::to_string(&TokenOutput::from_token(&token))?);
    } else {
        println!("{}", token.access_token);
    }
    Ok(())
}

async fn cmd_refresh(cli: &Cli, args: &JsonArgs) -> anyhow::Result<()> {
    let token = refresh_stored(&cli.auth_config(), &TokenClient::new()?, &cli.store()?).await?;
    if args.json {
        println!("{}", serde_json::to_string(&SavedOutput::from_token(&token))?);
    } else {
        println!("Token refreshed.");
    }
    Ok(())
}

async fn cmd_status(cli: &Cli) -> anyhow::Result<()> {
    let token = match cli.store()?.load() {
        Ok(t) => Some(t),
        Err(e) if e.is_not_found() && cli.api_key().is_some() => None,
        Err(e) => return Err(e.into()),
    };
    let config = cli.auth_config();
    let base = config
        .resolved_api_url()
        .or_else(|| token.as_ref().and_then(|t| t.api_url.as_deref()))
        .ok_or(AuthError::Config("api_url"))?;

    let auth = ApiAuth::resolve(cli.api_key(), token.as_ref());
    match ApiClient::new(base, auth, API_REQUEST_TIMEOUT)?.validate().await {
        Ok(()) => {
            println!("ok");
            Ok(())
        }
        Err(AuthError::Api { status, body }) => {
            println!("{body}");
            anyhow::bail!("token invalid: HTTP {status}")
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_logout(cli: &Cli) -> anyhow::Result<()> {
    cli.store()?.clear()?;
    println!("Token removed.");
    Ok(())
}

fn print_saved(token: &Token, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&SavedOutput::from_token(token))?);
    } else {
        println!("Token saved.");
    }
    Ok(())
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
