// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use clap::Parser;
use scimcp::ScimClient;
use scimcp_cli::Args;
use scimcp_cli::Operator;
use scimcp_cli::load_config;
use scimcp_cli::logger;

fn main() -> anyhow::Result<()> {
    let opt: Args = Args::try_parse()?;

    let config = load_config(opt.base_url, opt.token, opt.debug)?;
    let log = logger(config.debug);
    let client = ScimClient::new(log.clone(), config)?;

    let stdin = std::io::stdin();
    let mut operator =
        Operator::new(log, client, stdin.lock(), std::io::stdout());

    operator.run(opt.command)
}
