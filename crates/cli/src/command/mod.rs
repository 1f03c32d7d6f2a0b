// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommands: `auth`.

pub mod auth;

use labradoc_auth::AuthError;

use crate::config::{Cli, Command};

/// Dispatch the parsed command line.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Auth(ref args) => auth::run(cli, args).await,
    }
}

/// Process exit code for a failed command: 2 for usage and configuration
/// problems, 1 for everything else.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AuthError>() {
        Some(AuthError::Config(_) | AuthError::InvalidInput(_)) => 2,
        _ => 1,
    }
}
