use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::debug;

use super::provider::ToolProvider;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

#[derive(Default)]
struct Catalog {
    tools: Vec<Tool>,
    // tool name -> index into providers
    routes: HashMap<String, usize>,
}

/// Routes tool calls to the provider that declared them.
///
/// Declarations are discovered once via `refresh` and cached; call `refresh`
/// again if a provider's tool set can change during the process lifetime.
pub struct ToolRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    catalog: RwLock<Catalog>,
}

impl ToolRegistry {
    pub fn new(providers: Vec<Arc<dyn ToolProvider>>) -> Self {
        Self {
            providers,
            catalog: RwLock::new(Catalog::default()),
        }
    }

    /// Re-discover tools from every provider, replacing the cached catalog.
    ///
    /// Tool names must be unique across providers; a collision makes routing
    /// ambiguous and fails the refresh.
    pub async fn refresh(&self) -> AgentResult<()> {
        let mut catalog = Catalog::default();

        for (index, provider) in self.providers.iter().enumerate() {
            let tools = provider.list_tools().await?;
            debug!(provider = provider.name(), count = tools.len(), "discovered tools");

            for tool in tools {
                if catalog.routes.contains_key(&tool.name) {
                    return Err(AgentError::Internal(format!(
                        "Duplicate tool name across providers: {}",
                        tool.name
                    )));
                }
                catalog.routes.insert(tool.name.clone(), index);
                catalog.tools.push(tool);
            }
        }

        *self.catalog.write().unwrap() = catalog;
        Ok(())
    }

    /// Snapshot of the cached tool declarations
    pub fn tools(&self) -> Vec<Tool> {
        self.catalog.read().unwrap().tools.clone()
    }

    /// Execute a tool call with the provider that declared it.
    ///
    /// Fails with `ToolNotFound` when the name is absent from the catalog and
    /// with `InvalidArguments` when the arguments are missing fields the
    /// tool's schema declares as required. Deeper schema validation is left
    /// to the provider, which owns the schema.
    pub async fn dispatch(&self, tool_call: ToolCall) -> AgentResult<Value> {
        let (provider_index, input_schema) = {
            let catalog = self.catalog.read().unwrap();
            match catalog.routes.get(&tool_call.name) {
                Some(&index) => {
                    let schema = catalog
                        .tools
                        .iter()
                        .find(|tool| tool.name == tool_call.name)
                        .map(|tool| tool.input_schema.clone());
                    (index, schema)
                }
                None => return Err(AgentError::ToolNotFound(tool_call.name.clone())),
            }
        };

        if let Some(schema) = &input_schema {
            check_required_arguments(&tool_call, schema)?;
        }

        self.providers[provider_index].invoke(tool_call).await
    }
}

fn check_required_arguments(tool_call: &ToolCall, schema: &Value) -> AgentResult<()> {
    let required = match schema.get("required").and_then(|r| r.as_array()) {
        Some(required) if !required.is_empty() => required,
        _ => return Ok(()),
    };

    let arguments = tool_call.arguments.as_object().ok_or_else(|| {
        AgentError::InvalidArguments(format!(
            "Tool {} requires an object of arguments",
            tool_call.name
        ))
    })?;

    for field in required {
        if let Some(name) = field.as_str() {
            if !arguments.contains_key(name) {
                return Err(AgentError::InvalidArguments(format!(
                    "Tool {} is missing required argument: {}",
                    tool_call.name, name
                )));
            }
        }
    }

    Ok(())
}
