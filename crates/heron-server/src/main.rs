mod configuration;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Result;
use heron::agent::Agent;
use heron::mcp::McpClient;
use heron::providers::factory;
use heron::tools::{ToolProvider, ToolRegistry};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::configuration::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    // A missing credential fails here, not in the middle of a turn
    let settings = Settings::new()?;

    let provider = factory::get_provider(settings.provider.into_config())?;

    let mut tool_providers: Vec<Arc<dyn ToolProvider>> = Vec::new();
    for tool_server in settings.tools {
        let name = tool_server.name.clone();
        let client = McpClient::connect(tool_server.into_config()).await?;
        info!(server = %name, "connected tool server");
        tool_providers.push(Arc::new(client));
    }

    let registry = Arc::new(ToolRegistry::new(tool_providers));
    registry.refresh().await?;
    info!(tools = registry.tools().len(), "tool registry ready");

    let state = AppState {
        agent: Arc::new(Agent::new(provider, registry)),
    };

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
