//! These models represent the objects passed around by the agent
//!
//! There are several related formats we need to interact with:
//! - chat messages sent from the interface to the backend
//! - openai-style messages/tools, sent from the agent to the LLM
//! - tool requests, sent from the agent to the tool providers
//!
//! Incoming and outgoing data is converted to these internal structs at the
//! boundary (see providers::utils for the LLM wire conversion), so the rest
//! of the code only ever deals with one shape.
pub mod message;
pub mod role;
pub mod tool;
