use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// Any message arriving on the server's stdout. Responses carry `id` and one
/// of `result`/`error`; server-initiated requests and notifications carry
/// `method` and are not paired to anything we sent.
#[derive(Debug, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcMessage {
    pub fn into_result(self) -> AgentResult<Value> {
        if let Some(error) = self.error {
            return Err(AgentError::ExecutionError(format!(
                "Server returned error {}: {}",
                error.code, error.message
            )));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub input_schema: Value,
}

impl From<ToolDeclaration> for Tool {
    fn from(declaration: ToolDeclaration) -> Self {
        Tool::new(
            declaration.name,
            declaration.description.unwrap_or_default(),
            declaration.input_schema,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<ToolDeclaration>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

/// Decode a tools/call result into a structured value.
///
/// Text content that parses as JSON comes back structured, so a tool that
/// returned `{"total": 42}` is observable as that object and not as an opaque
/// string. Anything else passes through as text. An `isError` result maps to
/// an execution failure carrying the server's message.
pub fn decode_call_result(result: CallToolResult) -> AgentResult<Value> {
    let text = result
        .content
        .iter()
        .filter(|content| content.content_type == "text")
        .filter_map(|content| content.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error {
        return Err(AgentError::ExecutionError(if text.is_empty() {
            "Tool reported an error without detail".to_string()
        } else {
            text
        }));
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
