// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-memory SCIM 2.0 provider that records every request it receives.
//!
//! The server is a test fixture for `scimcp`: integration tests point a real
//! client at it and then assert on what actually went over the wire. It can
//! also be run on its own with the `scimcp-mock-provider-server` binary.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use anyhow::anyhow;
use dropshot::ApiDescription;
use dropshot::Body;
use dropshot::ConfigDropshot;
use dropshot::HttpError;
use dropshot::HttpServer;
use dropshot::Path;
use dropshot::Query;
use dropshot::RequestContext;
use dropshot::RequestInfo;
use dropshot::ServerBuilder;
use dropshot::UntypedBody;
use dropshot::endpoint;
use http::Response;
use http::StatusCode;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use slog::Logger;
use slog::info;

use scimcp::*;

mod error;
mod groups;
mod store;
mod users;

pub use error::*;
pub use store::*;

/// Lock a mutex, carrying on with the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One request as the server saw it, before any routing decision.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,

    /// Path and query string, still percent-encoded
    pub uri: String,

    pub path: String,

    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,

    /// The raw request body; empty when none was sent
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The body parsed as JSON, `None` if empty or not JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    fn from_request(request: &RequestInfo, body: &[u8]) -> Self {
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Self {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            path: request.uri().path().to_string(),
            headers,
            body: body.to_vec(),
        }
    }
}

/// A response to hand back verbatim to the next request, whatever it is.
#[derive(Clone, Debug)]
pub struct CannedResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

impl CannedResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: String::from("text/plain"),
            body: body.into(),
        }
    }

    fn to_http_response(&self) -> Result<Response<Body>, http::Error> {
        Response::builder()
            .status(self.status)
            .header(http::header::CONTENT_TYPE, self.content_type.as_str())
            .body(self.body.clone().into())
    }
}

pub struct ServerContext {
    log: Logger,
    bearer: Option<String>,
    store: Store,
    requests: Mutex<Vec<RecordedRequest>>,
    canned: Mutex<Option<CannedResponse>>,
}

impl ServerContext {
    /// When `bearer` is set, every request must carry
    /// `Authorization: Bearer <bearer>`.
    pub fn new(log: Logger, bearer: Option<String>) -> Self {
        Self {
            log,
            bearer,
            store: Store::new(),
            requests: Mutex::new(Vec::new()),
            canned: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }

    /// Answer the next request with `response` instead of handling it.
    pub fn respond_once(&self, response: CannedResponse) {
        *lock(&self.canned) = Some(response);
    }

    /// Record the request, then answer it early if a canned response is
    /// queued or the bearer token is wrong. `None` means carry on.
    fn intercept(
        &self,
        request: &RequestInfo,
        body: &[u8],
    ) -> Option<Result<Response<Body>, http::Error>> {
        lock(&self.requests).push(RecordedRequest::from_request(request, body));

        if let Some(canned) = lock(&self.canned).take() {
            info!(self.log, "serving canned response";
                "status" => canned.status.as_u16());
            return Some(canned.to_http_response());
        }

        if let Some(bearer) = &self.bearer {
            let expected = format!("Bearer {bearer}");
            let presented = request
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok());

            if presented != Some(expected.as_str()) {
                return Some(ScimError::unauthorized().to_http_response());
            }
        }

        None
    }
}

fn parse_body<T: DeserializeOwned>(body: &UntypedBody) -> Result<T, ScimError> {
    serde_json::from_slice(body.as_bytes()).map_err(|e| {
        ScimError::invalid_syntax(format!("unable to parse request body: {e}"))
    })
}

pub fn api() -> Result<ApiDescription<Arc<ServerContext>>, anyhow::Error> {
    let mut api = ApiDescription::new();

    api.register(users::list_users).map_err(|e| anyhow!("{e}"))?;
    api.register(users::get_user).map_err(|e| anyhow!("{e}"))?;
    api.register(users::create_user).map_err(|e| anyhow!("{e}"))?;
    api.register(users::put_user).map_err(|e| anyhow!("{e}"))?;
    api.register(users::delete_user).map_err(|e| anyhow!("{e}"))?;

    api.register(groups::list_groups).map_err(|e| anyhow!("{e}"))?;
    api.register(groups::get_group).map_err(|e| anyhow!("{e}"))?;
    api.register(groups::create_group).map_err(|e| anyhow!("{e}"))?;
    api.register(groups::put_group).map_err(|e| anyhow!("{e}"))?;
    api.register(groups::patch_group).map_err(|e| anyhow!("{e}"))?;
    api.register(groups::delete_group).map_err(|e| anyhow!("{e}"))?;

    Ok(api)
}

/// Start serving on `bind_address`. Must be called from within a tokio
/// runtime.
pub fn create_http_server(
    log: Logger,
    context: Arc<ServerContext>,
    bind_address: SocketAddr,
) -> Result<HttpServer<Arc<ServerContext>>, anyhow::Error> {
    let config = ConfigDropshot { bind_address, ..Default::default() };

    ServerBuilder::new(api()?, context, log)
        .config(config)
        .start()
        .map_err(|e| anyhow!("starting server failed: {e}"))
}

/// A server on an ephemeral 127.0.0.1 port, running on its own runtime so
/// that blocking clients can talk to it from plain tests. Shut down on drop.
pub struct BackgroundServer {
    runtime: tokio::runtime::Runtime,
    server: Option<HttpServer<Arc<ServerContext>>>,
    context: Arc<ServerContext>,
    local_addr: SocketAddr,
}

impl BackgroundServer {
    pub fn start(
        log: Logger,
        bearer: Option<String>,
    ) -> Result<Self, anyhow::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let context = Arc::new(ServerContext::new(log.clone(), bearer));
        let bind_address: SocketAddr = "127.0.0.1:0".parse()?;

        let server = {
            let _guard = runtime.enter();
            create_http_server(log, context.clone(), bind_address)?
        };
        let local_addr = server.local_addr();

        Ok(Self { runtime, server: Some(server), context, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The SCIM base URL, i.e. with the `/v2` prefix.
    pub fn base_url(&self) -> String {
        format!("http://{}/v2", self.local_addr)
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            // Nothing useful to do with a shutdown error here
            let _ = self.runtime.block_on(server.close());
        }
    }
}
