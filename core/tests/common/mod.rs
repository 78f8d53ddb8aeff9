// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::Mutex;

use scimcp::ClientConfig;
use scimcp::ScimClient;
use scimcp_mock_provider_server::BackgroundServer;
use scimcp_mock_provider_server::RecordedRequest;
use slog::Logger;

pub const TOKEN: &str = "test-token";

pub fn discard() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

/// Keeps the message of every record logged through it.
#[derive(Clone, Default)]
pub struct CapturedLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedLog {
    pub fn logger(&self) -> Logger {
        Logger::root(self.clone(), slog::o!())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl slog::Drain for CapturedLog {
    type Ok = ();
    type Err = slog::Never;

    fn log(
        &self,
        record: &slog::Record,
        _values: &slog::OwnedKVList,
    ) -> Result<Self::Ok, Self::Err> {
        self.lines.lock().unwrap().push(record.msg().to_string());
        Ok(())
    }
}

pub fn server() -> BackgroundServer {
    BackgroundServer::start(discard(), Some(TOKEN.to_string())).unwrap()
}

pub fn client(server: &BackgroundServer) -> ScimClient {
    ScimClient::new(discard(), ClientConfig::new(server.base_url(), TOKEN))
        .unwrap()
}

pub fn debug_client(server: &BackgroundServer, log: Logger) -> ScimClient {
    let config = ClientConfig::new(server.base_url(), TOKEN).with_debug(true);
    ScimClient::new(log, config).unwrap()
}

/// A base URL on which nothing is listening.
pub fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("http://{addr}/v2")
}

/// The decoded query string of a recorded request.
pub fn query_pairs(request: &RecordedRequest) -> Vec<(String, String)> {
    reqwest::Url::parse(&format!("http://mock{}", request.uri))
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}
