mod session;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cliclack::spinner;
use console::style;

use heron::agent::{Agent, AgentConfig};
use heron::mcp::{McpClient, McpServerConfig};
use heron::providers::base::Provider;
use heron::providers::configs::{OllamaProviderConfig, OpenAiProviderConfig};
use heron::providers::ollama::{OllamaProvider, OLLAMA_HOST};
use heron::providers::openai::OpenAiProvider;
use heron::tools::{ToolProvider, ToolRegistry};

use crate::session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Provider option (openai or ollama)
    #[arg(short, long, default_value = "open-ai")]
    #[arg(value_enum)]
    provider: ProviderVariant,

    /// OpenAI API Key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, default_value = "gpt-4o-mini")]
    model: String,

    /// MCP tool server to launch, given as a command line (repeatable)
    #[arg(long = "tool-server", value_name = "COMMAND")]
    tool_servers: Vec<String>,

    /// How many tool rounds a single turn may run
    #[arg(long, default_value_t = 1)]
    max_tool_rounds: usize,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProviderVariant {
    OpenAi,
    Ollama,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let provider = get_provider(&cli)?;

    let mut tool_providers: Vec<Arc<dyn ToolProvider>> = Vec::new();
    for command_line in &cli.tool_servers {
        let config = parse_tool_server(command_line)?;
        let name = config.name.clone();

        let spin = spinner();
        spin.start(format!("connecting {}", name));
        let client = McpClient::connect(config).await?;
        spin.stop(format!("connected {}", name));

        tool_providers.push(Arc::new(client));
    }

    let registry = Arc::new(ToolRegistry::new(tool_providers));
    registry.refresh().await?;

    let agent = Agent::new(provider, registry).with_config(AgentConfig {
        max_tool_rounds: cli.max_tool_rounds,
        ..AgentConfig::default()
    });

    println!(
        "Heron chat {}",
        style("- type \"exit\" to end the session").dim()
    );
    println!();

    let mut session = Session::new(agent);
    session.start().await
}

fn parse_tool_server(command_line: &str) -> Result<McpServerConfig> {
    let mut parts = command_line.split_whitespace();
    let command = parts
        .next()
        .context("tool server command must not be empty")?
        .to_string();
    let args: Vec<String> = parts.map(str::to_string).collect();
    let name = std::path::Path::new(&command)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("tools")
        .to_string();

    Ok(McpServerConfig {
        name,
        command,
        args,
        env: HashMap::new(),
    })
}

fn get_provider(cli: &Cli) -> Result<Box<dyn Provider>> {
    match cli.provider {
        ProviderVariant::OpenAi => {
            let api_key = cli
                .api_key
                .clone()
                .or_else(|| env::var("OPENAI_API_KEY").ok())
                .context(
                    "API key must be provided via --api-key or OPENAI_API_KEY environment variable",
                )?;

            Ok(Box::new(OpenAiProvider::new(OpenAiProviderConfig {
                host: "https://api.openai.com".to_string(),
                api_key,
                model: cli.model.clone(),
                temperature: None,
                max_tokens: None,
            })?))
        }
        ProviderVariant::Ollama => Ok(Box::new(OllamaProvider::new(OllamaProviderConfig {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| OLLAMA_HOST.to_string()),
            model: cli.model.clone(),
            temperature: None,
            max_tokens: None,
        })?)),
    }
}
