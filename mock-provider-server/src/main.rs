// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use slog::Drain;
use slog::info;

use scimcp_mock_provider_server::ServerContext;
use scimcp_mock_provider_server::create_http_server;

#[derive(Debug, Parser)]
#[clap(about = "In-memory SCIM 2 provider server")]
struct Args {
    // Note that port "4567" is arbitrarily chosen and is not SCIM specific.
    #[clap(long, default_value = "127.0.0.1:4567")]
    bind_addr: SocketAddr,

    /// Require this Bearer token on every request
    #[clap(long)]
    bearer: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt: Args = Args::try_parse()?;

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let log = slog::Logger::root(drain, slog::o!());

    let context = Arc::new(ServerContext::new(log.clone(), opt.bearer));
    let http_server = create_http_server(log.clone(), context, opt.bind_addr)?;

    let url = format!("http://{}/v2", http_server.local_addr());
    info!(log, "serving SCIM"; "url" => url);

    if let Err(s) = http_server.await {
        anyhow::bail!("Error from start(): {}", s);
    }

    Ok(())
}
