// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::BufRead;
use std::io::Write;

use scimcp::Dispatcher;
use serde_json::Value;
use serde_json::json;
use slog::Logger;
use slog::debug;
use slog::info;
use slog::warn;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "scimcp";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    fn to_reply(&self, id: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": self.code, "message": self.message },
        })
    }
}

fn parse_error() -> Value {
    RpcError::new(PARSE_ERROR, "Parse error").to_reply(Value::Null)
}

/// Serves the dispatcher's tools as newline-delimited JSON-RPC 2.0.
///
/// One message per line in, one reply per line out. Requests without an `id`
/// are notifications and never get a reply. No single line, however
/// malformed, stops the server; only end of input does.
pub struct ToolServer {
    log: Logger,
    dispatcher: Dispatcher,
}

impl ToolServer {
    pub fn new(log: Logger, dispatcher: Dispatcher) -> Self {
        Self { log, dispatcher }
    }

    /// Answer messages until `input` is exhausted. Only an I/O error on
    /// `input` or `output` ends this early.
    pub fn serve<R: BufRead, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> std::io::Result<()> {
        info!(self.log, "serving tools on stdio";
            "tools" => self.dispatcher.tools().len());

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            let reply = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line),
                Err(e) => {
                    warn!(self.log, "message is not UTF-8"; "error" => %e);
                    Some(parse_error())
                }
            };

            if let Some(reply) = reply {
                serde_json::to_writer(&mut output, &reply)?;
                output.write_all(b"\n")?;
                output.flush()?;
            }
        }

        info!(self.log, "end of input, shutting down");
        Ok(())
    }

    /// The reply to one line of input, if it warrants one.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(self.log, "unparseable message"; "error" => %e);
                return Some(parse_error());
            }
        };

        let id = message.get("id").cloned();

        let Some(method) = message.get("method").and_then(Value::as_str) else {
            return Some(
                RpcError::new(INVALID_REQUEST, "Invalid Request")
                    .to_reply(id.unwrap_or(Value::Null)),
            );
        };

        debug!(self.log, "request"; "method" => method);

        let params = message.get("params").cloned().unwrap_or(Value::Null);
        let result = self.handle(method, params);

        // Notifications are acted on but never answered
        let id = id?;

        Some(match result {
            Ok(result) => {
                json!({ "jsonrpc": "2.0", "id": id, "result": result })
            }
            Err(error) => error.to_reply(id),
        })
    }

    fn handle(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),

            "tools/list" => Ok(json!({ "tools": self.dispatcher.tools() })),

            "tools/call" => {
                let Some(name) = params.get("name").and_then(Value::as_str)
                else {
                    return Err(RpcError::new(
                        INVALID_PARAMS,
                        "tools/call requires a tool name",
                    ));
                };

                let arguments =
                    params.get("arguments").cloned().unwrap_or(Value::Null);
                let outcome = self.dispatcher.call(name, arguments);
                let text = serde_json::to_string_pretty(&outcome)
                    .unwrap_or_else(|_| outcome.to_json().to_string());

                Ok(json!({
                    "content": [ { "type": "text", "text": text } ],
                    "isError": outcome.is_error(),
                }))
            }

            "ping" => Ok(json!({})),

            _ => Err(RpcError::new(METHOD_NOT_FOUND, "Method not found")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use scimcp::ClientConfig;
    use scimcp::ScimClient;
    use std::net::TcpListener;

    /// A server whose provider is unreachable; nothing here needs one.
    fn tool_server() -> ToolServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let log = Logger::root(slog::Discard, slog::o!());
        let config = ClientConfig::new(format!("http://{addr}/v2"), "t");
        let client = ScimClient::new(log.clone(), config).unwrap();

        ToolServer::new(log.clone(), Dispatcher::new(log, client))
    }

    fn serve(input: &str) -> Vec<Value> {
        serve_bytes(input.as_bytes())
    }

    fn serve_bytes(input: &[u8]) -> Vec<Value> {
        let mut output = Vec::new();
        tool_server().serve(input, &mut output).unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_initialize_and_list() {
        let replies = serve(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"two","method":"tools/list"}"#,
            "\n",
        ));

        assert_eq!(replies.len(), 2);

        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(replies[0]["result"]["serverInfo"]["name"], "scimcp");
        assert_eq!(replies[0]["result"]["capabilities"], json!({"tools": {}}));

        assert_eq!(replies[1]["id"], "two");
        let tools = replies[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
        assert!(tools.iter().all(|tool| tool["inputSchema"].is_object()));
    }

    #[test]
    fn test_bad_lines_do_not_stop_the_server() {
        let replies = serve(concat!(
            "this is not json\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":8}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#,
            "\n",
        ));

        assert_eq!(replies.len(), 4);

        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(replies[0]["error"]["code"], -32700);
        assert_eq!(replies[0]["error"]["message"], "Parse error");

        assert_eq!(replies[1]["id"], 7);
        assert_eq!(replies[1]["error"]["code"], -32601);

        assert_eq!(replies[2]["id"], 8);
        assert_eq!(replies[2]["error"]["code"], -32600);

        assert_eq!(
            replies[3],
            json!({"jsonrpc": "2.0", "id": 9, "result": {}})
        );
    }

    #[test]
    fn test_invalid_utf8_does_not_stop_the_server() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"id\":1,\"method\":\"p\xffng\"}\n");
        input.extend_from_slice(b"\xfe\xfe\n");
        // The last line may end without a newline
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);

        let replies = serve_bytes(&input);

        assert_eq!(replies.len(), 3);
        for reply in &replies[..2] {
            assert_eq!(reply["id"], Value::Null);
            assert_eq!(reply["error"]["code"], -32700);
        }
        assert_eq!(
            replies[2],
            json!({"jsonrpc": "2.0", "id": 2, "result": {}})
        );
    }

    #[test]
    fn test_tool_call_wraps_envelope_as_text() {
        let server = tool_server();

        let reply = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"scim_create_user","arguments":{"email":"a@b.c"}}}"#,
            )
            .unwrap();

        assert_eq!(reply["result"]["isError"], true);
        let content = &reply["result"]["content"][0];
        assert_eq!(content["type"], "text");

        let envelope: Value =
            serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(envelope["tool"], "scim_create_user");
        assert_eq!(envelope["arguments"], json!({"email": "a@b.c"}));
        assert_eq!(
            envelope["error"],
            "missing required argument(s): first_name, last_name"
        );

        // A call without a name is a protocol error, not a tool error
        let reply = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call"}"#)
            .unwrap();
        assert_eq!(reply["error"]["code"], -32602);
    }

    #[test]
    fn test_tool_call_transport_failure() {
        let reply = tool_server()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_user","arguments":{"user_id":"u1"}}}"#,
            )
            .unwrap();

        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        let envelope: Value = serde_json::from_str(text).unwrap();
        assert!(envelope["error"].as_str().unwrap().starts_with("transport"));
        assert_eq!(envelope["tool"], "get_user");
    }
}
