// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Context;
use scimcp::ClientConfig;
use slog::Drain;
use slog::Level;
use slog::Logger;

mod commands;
mod stdio;

pub use commands::*;
pub use stdio::*;

/// The root logger for a binary: terminal output on stderr, never stdout.
pub fn logger(debug: bool) -> Logger {
    let level = if debug { Level::Debug } else { Level::Info };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();

    Logger::root(drain, slog::o!())
}

/// Resolve the client configuration, preferring flags over the environment.
/// A `.env` file in the working directory is loaded first if there is one.
pub fn load_config(
    base_url: Option<String>,
    token: Option<String>,
    debug: bool,
) -> anyhow::Result<ClientConfig> {
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env(base_url, token).context(
        "set SCIM_BASE_URL and SCIM_TOKEN (or pass --base-url and --token)",
    )?;

    let debug = config.debug || debug;
    Ok(config.with_debug(debug))
}
