//! Stdio tool server
//!
//! Newline-delimited JSON-RPC 2.0: one request per line on stdin, one response per
//! line on stdout. Requests are served one at a time. Logging goes to stderr.

use forgebridge_core::ForgeError;
use forgebridge_repo::ToolProvider;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Serves one forge's tool catalog
pub struct ToolServer {
    provider: Box<dyn ToolProvider>,
}

impl ToolServer {
    pub fn new(provider: Box<dyn ToolProvider>) -> Self {
        Self { provider }
    }

    fn server_name(&self) -> String {
        format!("forgebridge-{}", self.provider.forge())
    }

    /// Read requests until EOF, writing one response line per request that expects one
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("{} serving {} tools", self.server_name(), self.provider.tools().len());

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                let mut encoded = response.to_string();
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable request: {}", e);
                return Some(json_rpc_error(None, PARSE_ERROR, &format!("Parse error: {}", e)));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(json_rpc_error(
                id,
                INVALID_REQUEST,
                &format!("Invalid request: {}", e),
            )),
        }
    }

    async fn handle(&self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        let expects_response = !matches!(request.id, None | Some(Value::Null));
        debug!("Handling {}", method);

        if method.starts_with("notifications/") || method == "initialized" {
            return None;
        }

        let response = match method {
            "initialize" => {
                let protocol_version = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(PROTOCOL_VERSION);

                json_rpc_response(
                    request.id,
                    json!({
                        "protocolVersion": protocol_version,
                        "serverInfo": {
                            "name": self.server_name(),
                            "version": env!("CARGO_PKG_VERSION"),
                        },
                        "capabilities": { "tools": {} },
                    }),
                )
            }
            "ping" => json_rpc_response(request.id, json!({})),
            "tools/list" => {
                json_rpc_response(request.id, json!({ "tools": self.provider.tools() }))
            }
            "tools/call" => self.call_tool(request.id, request.params).await,
            _ => json_rpc_error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", method),
            ),
        };

        expects_response.then_some(response)
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> Value {
        let Some(Value::Object(params)) = params else {
            return json_rpc_error(id, INVALID_PARAMS, "params must be an object");
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return json_rpc_error(id, INVALID_PARAMS, "params.name must be a string");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.provider.call(name, arguments).await {
            Ok(text) => json_rpc_response(
                id,
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "isError": false,
                }),
            ),
            Err(e @ (ForgeError::Validation { .. } | ForgeError::NotFound { .. })) => {
                json_rpc_error(id, INVALID_PARAMS, &e.to_string())
            }
            Err(e) => {
                e.log();
                json_rpc_error(id, INTERNAL_ERROR, &e.to_string())
            }
        }
    }
}
