//! Client side of the Model Context Protocol, the wire used to reach
//! external tool servers.
//!
//! Servers are separate processes spoken to over stdio with line-delimited
//! JSON-RPC 2.0. Responses are paired to requests by call id, so the client
//! can have several calls in flight against one server.
pub mod client;
pub mod protocol;

pub use client::{McpClient, McpServerConfig};
