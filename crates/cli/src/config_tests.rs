// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use clap::Parser;

use super::{Cli, Command};
use crate::command::auth::AuthCommand;

fn parse(args: &[&str]) -> anyhow::Result<Cli> {
    Ok(Cli::try_parse_from(args)?)
}

#[test]
#[serial_test::serial]
fn defaults_point_at_production() -> anyhow::Result<()> {
    let cli = parse(&["labradoc", "auth", "token"])?;
    cli.validate()?;
    let config = cli.auth_config();
    assert_eq!(config.auth_url, "https://auth.labradoc.eu");
    assert_eq!(config.realm, "labradoc");
    assert_eq!(config.client_id, "labradoc-openclaw");
    assert_eq!(config.scope, "openid profile email offline_access");
    assert_eq!(config.api_url.as_deref(), Some("https://labradoc.eu"));
    assert_eq!(cli.log_level, "warn");
    assert!(matches!(cli.command, Command::Auth(ref a) if matches!(a.command, AuthCommand::Token(_))));
    Ok(())
}

#[test]
#[serial_test::serial]
fn global_flags_after_subcommand() -> anyhow::Result<()> {
    let cli = parse(&[
        "labradoc",
        "auth",
        "url",
        "--realm",
        "staging",
        "--config-dir",
        "/tmp/labradoc-test",
        "--redirect-uri",
        "http://127.0.0.1:9999/callback",
    ])?;
    cli.validate()?;
    assert_eq!(cli.realm, "staging");
    assert_eq!(cli.config_dir.as_deref(), Some(Path::new("/tmp/labradoc-test")));
    match cli.command {
        Command::Auth(a) => match a.command {
            AuthCommand::Url(url) => {
                assert_eq!(url.redirect_uri, "http://127.0.0.1:9999/callback");
            }
            other => anyhow::bail!("unexpected command {other:?}"),
        },
    }
    Ok(())
}

#[yare::parameterized(
    empty_auth_url  = { &["labradoc", "--auth-url", " ", "auth", "token"], "--auth-url" },
    empty_realm     = { &["labradoc", "--realm", "", "auth", "token"], "--realm" },
    empty_client_id = { &["labradoc", "--client-id", "", "auth", "token"], "--client-id" },
    bad_log_format  = { &["labradoc", "--log-format", "xml", "auth", "token"], "--log-format" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let cli = match parse(args) {
        Ok(c) => c,
        Err(e) => panic!("parse: {e}"),
    };
    crate::assert_err_contains!(cli.validate(), expected_substr);
}

#[test]
#[serial_test::serial]
fn env_overrides_defaults() -> anyhow::Result<()> {
    std::env::set_var("LABRADOC_CLIENT_ID", "from-env");
    std::env::set_var("LABRADOC_API_KEY", "  ");
    let cli = parse(&["labradoc", "auth", "status"]);
    std::env::remove_var("LABRADOC_CLIENT_ID");
    std::env::remove_var("LABRADOC_API_KEY");

    let cli = cli?;
    assert_eq!(cli.client_id, "from-env");
    assert_eq!(cli.api_key(), None, "blank api key is ignored");
    Ok(())
}

#[test]
fn empty_api_url_is_not_stamped() -> anyhow::Result<()> {
    let cli = parse(&["labradoc", "--api-url", "", "auth", "logout"])?;
    assert_eq!(cli.auth_config().api_url, None);
    Ok(())
}

#[test]
fn login_timeout_defaults_to_two_minutes() -> anyhow::Result<()> {
    let cli = parse(&["labradoc", "auth", "login"])?;
    match cli.command {
        Command::Auth(a) => match a.command {
            AuthCommand::Login(login) => assert_eq!(login.timeout, 120),
            other => anyhow::bail!("unexpected command {other:?}"),
        },
    }
    Ok(())
}

#[test]
fn exchange_requires_code() {
    assert!(parse(&["labradoc", "auth", "exchange"]).is_err());
}

#[test]
fn store_uses_config_dir() -> anyhow::Result<()> {
    let cli = parse(&["labradoc", "--config-dir", "/tmp/labradoc-store", "auth", "token"])?;
    assert_eq!(cli.store()?.token_path(), Path::new("/tmp/labradoc-store/token.json"));
    Ok(())
}
