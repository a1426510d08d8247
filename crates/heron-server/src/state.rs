use std::sync::Arc;

use heron::agent::Agent;

/// Shared application state: the agent is built once at startup and handed
/// to every request by handle.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}
