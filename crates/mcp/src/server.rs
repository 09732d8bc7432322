//! Line-framed JSON-RPC 2.0 over stdio. The host runtime spawns the server
//! as a long-lived child process; stdout carries protocol frames and nothing
//! else, so all diagnostics go through tracing (configured to a file by the
//! binary).

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// One entry in the tools/list manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A tool surface served over the protocol.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn server_name(&self) -> &str;
    fn tools(&self) -> Vec<ToolDef>;
    async fn call(&self, name: &str, arguments: &Value) -> Result<String>;
}

/// Dispatch a single request object. Returns None for notifications, which
/// get no response frame.
pub async fn handle_request(provider: &dyn ToolProvider, request: &Value) -> Option<Value> {
    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
    let id = request.get("id").cloned();

    // Notifications carry no id and expect no reply.
    id.as_ref()?;
    let id = id.unwrap_or(Value::Null);

    let result = match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": provider.server_name(),
                "version": env!("CARGO_PKG_VERSION"),
            }
        })),
        "tools/list" => Ok(json!({ "tools": provider.tools() })),
        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or(Value::Null);
            let name = params.get("name").and_then(|n| n.as_str());
            match name {
                None => Err((INVALID_PARAMS, "tools/call requires params.name".to_string())),
                Some(name) => {
                    let arguments = params
                        .get("arguments")
                        .cloned()
                        .unwrap_or_else(|| json!({}));
                    match provider.call(name, &arguments).await {
                        Ok(text) => Ok(json!({
                            "content": [{ "type": "text", "text": text }],
                            "isError": false
                        })),
                        Err(e) => {
                            tracing::warn!(tool = name, error = %e, "Tool call failed");
                            Ok(json!({
                                "content": [{ "type": "text", "text": format!("Error: {e}") }],
                                "isError": true
                            }))
                        }
                    }
                }
            }
        }
        "ping" => Ok(json!({})),
        other => Err((METHOD_NOT_FOUND, format!("Unknown method: {other}"))),
    };

    Some(match result {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    })
}

/// Serve the provider over this process's stdin/stdout until EOF.
pub async fn serve(provider: &dyn ToolProvider) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    tracing::info!(server = provider.server_name(), "Protocol server ready");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable frame");
                let response = json!({
                    "jsonrpc": "2.0",
                    "id": Value::Null,
                    "error": { "code": PARSE_ERROR, "message": format!("Parse error: {e}") }
                });
                write_frame(&mut stdout, &response).await?;
                continue;
            }
        };
        if let Some(response) = handle_request(provider, &request).await {
            write_frame(&mut stdout, &response).await?;
        }
    }
    tracing::info!("Stdin closed; shutting down");
    Ok(())
}

async fn write_frame(stdout: &mut tokio::io::Stdout, frame: &Value) -> Result<()> {
    let mut bytes = serde_json::to_vec(frame)?;
    bytes.push(b'\n');
    stdout.write_all(&bytes).await?;
    stdout.flush().await?;
    Ok(())
}
