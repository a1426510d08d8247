use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::protocol::{
    decode_call_result, CallToolResult, InitializeResult, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, ListToolsResult, JSONRPC_VERSION, PROTOCOL_VERSION,
};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::tools::ToolProvider;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How to start one MCP server process
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcMessage>>>>;

/// A connection to one MCP server process.
///
/// The child's stdout is drained by a background task that pairs responses to
/// in-flight requests by id; requests can therefore overlap. The child is
/// killed when the client is dropped.
pub struct McpClient {
    name: String,
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    request_timeout: Duration,
    _child: Child,
}

impl McpClient {
    /// Spawn the server process and run the initialize handshake
    pub async fn connect(config: McpServerConfig) -> AgentResult<Self> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            AgentError::Internal(format!("Failed to start MCP server {}: {}", config.name, e))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            AgentError::Internal(format!("MCP server {} has no stdin", config.name))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AgentError::Internal(format!("MCP server {} has no stdout", config.name))
        })?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(read_loop(
            BufReader::new(stdout),
            pending.clone(),
            config.name.clone(),
        ));

        let client = Self {
            name: config.name,
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            _child: child,
        };

        let init = client
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "heron",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;
        let init: InitializeResult = serde_json::from_value(init).map_err(|e| {
            AgentError::Internal(format!(
                "Unexpected initialize response from {}: {}",
                client.name, e
            ))
        })?;
        debug!(
            server = %client.name,
            protocol = %init.protocol_version,
            "mcp server initialized"
        );

        client
            .notify("notifications/initialized", Value::Null)
            .await?;

        Ok(client)
    }

    async fn send_line(&self, line: String) -> AgentResult<()> {
        let io_err = |e: std::io::Error| {
            AgentError::Internal(format!("Failed to write to MCP server {}: {}", self.name, e))
        };

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await.map_err(io_err)?;
        stdin.write_all(b"\n").await.map_err(io_err)?;
        stdin.flush().await.map_err(io_err)?;
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> AgentResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        };
        let line = serde_json::to_string(&request)
            .map_err(|e| AgentError::Internal(format!("Failed to encode request: {}", e)))?;

        if let Err(e) = self.send_line(line).await {
            self.pending.lock().unwrap().remove(&id);
            return Err(e);
        }

        match timeout(self.request_timeout, rx).await {
            Ok(Ok(message)) => message.into_result(),
            Ok(Err(_)) => Err(AgentError::Internal(format!(
                "MCP server {} closed the connection",
                self.name
            ))),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(AgentError::ExecutionTimeout(format!(
                    "MCP server {} did not answer {} within {:?}",
                    self.name, method, self.request_timeout
                )))
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> AgentResult<()> {
        let notification = JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION,
            method: method.to_string(),
            params,
        };
        let line = serde_json::to_string(&notification)
            .map_err(|e| AgentError::Internal(format!("Failed to encode notification: {}", e)))?;
        self.send_line(line).await
    }
}

#[async_trait]
impl ToolProvider for McpClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> AgentResult<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(cursor) => json!({"cursor": cursor}),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                AgentError::Internal(format!(
                    "Unexpected tools/list response from {}: {}",
                    self.name, e
                ))
            })?;

            tools.extend(page.tools.into_iter().map(Tool::from));

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(tools)
    }

    async fn invoke(&self, tool_call: ToolCall) -> AgentResult<Value> {
        let result = self
            .request(
                "tools/call",
                json!({
                    "name": tool_call.name,
                    "arguments": tool_call.arguments,
                }),
            )
            .await?;
        let result: CallToolResult = serde_json::from_value(result).map_err(|e| {
            AgentError::Internal(format!(
                "Unexpected tools/call response from {}: {}",
                self.name, e
            ))
        })?;

        decode_call_result(result)
    }
}

async fn read_loop<R>(reader: BufReader<R>, pending: PendingMap, server: String)
where
    R: AsyncRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                route_message(line, &pending, &server);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(server = %server, error = %e, "error reading from mcp server");
                break;
            }
        }
    }

    // Dropping the senders wakes every in-flight request with a closed error
    pending.lock().unwrap().clear();
    debug!(server = %server, "mcp server disconnected");
}

fn route_message(line: &str, pending: &PendingMap, server: &str) {
    let message: JsonRpcMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(server = %server, error = %e, "discarding unparseable message");
            return;
        }
    };

    // Server-initiated requests and notifications are not paired to anything
    if let Some(method) = &message.method {
        debug!(server = %server, method = %method, "ignoring server-initiated message");
        return;
    }

    let id = match message.id.as_ref().and_then(|id| id.as_u64()) {
        Some(id) => id,
        None => {
            warn!(server = %server, "response without a usable id");
            return;
        }
    };

    match pending.lock().unwrap().remove(&id) {
        Some(tx) => {
            let _ = tx.send(message);
        }
        None => warn!(server = %server, id, "response for unknown request id"),
    }
}
