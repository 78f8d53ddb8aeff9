// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Context;
use clap::Parser;
use scimcp::Dispatcher;
use scimcp::ScimClient;
use scimcp_cli::ToolServer;
use scimcp_cli::load_config;
use scimcp_cli::logger;

#[derive(Debug, Parser)]
#[clap(about = "Serve SCIM tools over stdio (newline-delimited JSON-RPC)")]
struct Args {
    /// Defaults to $SCIM_BASE_URL
    #[clap(long)]
    base_url: Option<String>,

    /// A Bearer token, defaults to $SCIM_TOKEN
    #[clap(long)]
    token: Option<String>,

    #[clap(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let opt: Args = Args::try_parse()?;

    let config = load_config(opt.base_url, opt.token, opt.debug)?;
    let log = logger(config.debug);
    let client = ScimClient::new(log.clone(), config)
        .context("constructing the SCIM client")?;

    let server = ToolServer::new(log.clone(), Dispatcher::new(log, client));

    let stdin = std::io::stdin();
    server.serve(stdin.lock(), std::io::stdout().lock())?;

    Ok(())
}
