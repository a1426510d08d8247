use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolCall};

/// A source of invocable capabilities.
///
/// Providers declare their tools and execute calls; they do no caching or
/// retrying of their own. Retries, if desired, belong to the provider's
/// backing service or a wrapping policy.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Name of the provider, used in logs and error messages
    fn name(&self) -> &str;

    /// Discover the tools currently exposed by this provider
    async fn list_tools(&self) -> AgentResult<Vec<Tool>>;

    /// Execute a tool call and return its structured result
    async fn invoke(&self, tool_call: ToolCall) -> AgentResult<Value>;
}
