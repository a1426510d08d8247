use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::Tool;
use crate::providers::base::Provider;
use crate::tools::ToolRegistry;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use tools when necessary.";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// System prompt prepended to every planning request
    pub system_prompt: String,
    /// How many execute/resubmit cycles one turn may run. The response after
    /// the final round is returned as-is, even if it still requests tools.
    pub max_tool_rounds: usize,
    /// Bound on each individual tool invocation
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: 1,
            tool_timeout: Duration::from_secs(60),
        }
    }
}

/// Owns one side of the dialogue: a model that can request tool calls and
/// the registry that executes them.
///
/// Constructed once at startup and shared by handle; `respond` itself keeps
/// no state between calls, the caller resubmits the whole history each turn.
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one complete turn: plan, execute any requested tools in order,
    /// resubmit the results, and return the final assistant message.
    ///
    /// Tool execution failures are folded into tool-result content so the
    /// model can react to them; a request for a tool that does not exist at
    /// all ends the turn with `ToolNotFound` before anything is invoked.
    pub async fn respond(&self, conversation: &[Message]) -> AgentResult<Message> {
        let tools = self.registry.tools();
        let mut messages = conversation.to_vec();

        let mut response = self.plan(&messages, &tools).await?;

        for round in 0..self.config.max_tool_rounds {
            let requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();
            if requests.is_empty() {
                return Ok(response);
            }

            debug!(round, count = requests.len(), "executing tool requests");

            // Sequential, in declaration order: side-effecting tools observe
            // the same ordering the model asked for.
            let mut results = Message::user();
            for request in &requests {
                let outcome = self.execute(request).await?;
                if let Err(error) = &outcome {
                    warn!(id = %request.id, %error, "tool request failed");
                }
                results = results.with_tool_response(request.id.clone(), outcome);
            }

            messages.push(response);
            messages.push(results);

            response = self.plan(&messages, &tools).await?;
        }

        Ok(response)
    }

    async fn plan(&self, messages: &[Message], tools: &[Tool]) -> AgentResult<Message> {
        let (message, usage) = self
            .provider
            .complete(&self.config.system_prompt, messages, tools)
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "planning round complete"
        );

        Ok(message)
    }

    /// Execute one tool request. The outer Err ends the turn; an inner Err is
    /// folded into the tool result for the model to see.
    async fn execute(&self, request: &ToolRequest) -> AgentResult<AgentResult<serde_json::Value>> {
        let call = match &request.tool_call {
            Ok(call) => call.clone(),
            // The model produced an unusable call; report it back
            Err(error) => return Ok(Err(error.clone())),
        };

        let name = call.name.clone();
        match timeout(self.config.tool_timeout, self.registry.dispatch(call)).await {
            Ok(Ok(value)) => Ok(Ok(value)),
            // An unknown tool is terminal for the whole turn, never skipped
            Ok(Err(AgentError::ToolNotFound(name))) => Err(AgentError::ToolNotFound(name)),
            Ok(Err(error)) => Ok(Err(error)),
            Err(_) => Ok(Err(AgentError::ExecutionTimeout(format!(
                "{} did not complete within {:?}",
                name, self.config.tool_timeout
            )))),
        }
    }
}
