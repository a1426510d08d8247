//! Capability sources and the registry that routes tool calls to them.
//!
//! A ToolProvider is anything that can declare tools and execute them (an MCP
//! server process, an in-process toolkit). The agent only ever talks to the
//! ToolRegistry, which caches discovered declarations and dispatches calls by
//! name.
pub mod provider;
pub mod registry;

pub use provider::ToolProvider;
pub use registry::ToolRegistry;
