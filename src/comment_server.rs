//! Stdio JSON-RPC server exposing the tracking-comment update tool to the
//! agent process.
//!
//! Line-delimited JSON-RPC over stdin/stdout; logging goes to stderr so the
//! protocol stream stays clean. One tool, `update_tracking_comment`, bound
//! to the single comment this run owns. Tool failures are reported as
//! tool-call errors, never as a process exit.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::api::TrackerClient;
use crate::api::comments::write_comment_body;
use crate::sanitize::sanitize;

pub const SERVER_NAME: &str = "tracker-comment-server";
pub const TOOL_NAME: &str = "update_tracking_comment";

/// Connection settings for the one comment this server may write.
#[derive(Debug, Clone)]
pub struct CommentServerConfig {
    pub api_key: String,
    pub comment_id: String,
    pub api_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Serves requests from stdin until EOF.
pub async fn run(config: CommentServerConfig) -> Result<()> {
    let client = TrackerClient::with_endpoint(&config.api_endpoint, &config.api_key);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let request = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => request,
            Err(e) => {
                error!("failed to parse JSON-RPC message: {e}");
                continue;
            }
        };

        if let Some(response) = handle_request(&client, &config, request).await {
            let serialized =
                serde_json::to_string(&response).context("Failed to serialize response")?;
            stdout.write_all(serialized.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    debug!("stdin closed, comment server exiting");
    Ok(())
}

/// Dispatches one request. Notifications (no id) get no response.
async fn handle_request(
    client: &TrackerClient,
    config: &CommentServerConfig,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let id = request.id?;

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::ok(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "ping" => JsonRpcResponse::ok(id, json!({})),
        "tools/list" => JsonRpcResponse::ok(id, json!({ "tools": [tool_descriptor()] })),
        "tools/call" => handle_tool_call(client, config, id, request.params).await,
        other => JsonRpcResponse::err(id, -32601, format!("method not found: {other}")),
    };

    Some(response)
}

fn tool_descriptor() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Update the run's tracking comment on the tracker issue with progress and results",
        "inputSchema": {
            "type": "object",
            "properties": {
                "body": {
                    "type": "string",
                    "description": "The updated comment content (markdown)"
                }
            },
            "required": ["body"]
        }
    })
}

async fn handle_tool_call(
    client: &TrackerClient,
    config: &CommentServerConfig,
    id: Value,
    params: Option<Value>,
) -> JsonRpcResponse {
    let Some(params) = params else {
        return JsonRpcResponse::err(id, -32602, "missing params");
    };
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    if name != TOOL_NAME {
        return JsonRpcResponse::err(id, -32602, format!("unknown tool: {name}"));
    }
    let Some(body) = params
        .get("arguments")
        .and_then(|arguments| arguments.get("body"))
        .and_then(Value::as_str)
    else {
        return JsonRpcResponse::err(id, -32602, "missing required argument: body");
    };

    match write_comment_body(client, &config.comment_id, &sanitize(body)).await {
        Ok(()) => JsonRpcResponse::ok(
            id,
            json!({
                "content": [{ "type": "text", "text": "{\"success\":true}" }]
            }),
        ),
        Err(e) => {
            error!("tracking-comment update failed: {e}");
            JsonRpcResponse::ok(
                id,
                json!({
                    "content": [{ "type": "text", "text": format!("Error: {e}") }],
                    "isError": true
                }),
            )
        }
    }
}
