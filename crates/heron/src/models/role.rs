use serde::{Deserialize, Serialize};

/// Who authored a message. Tool results ride on user messages internally and
/// only become `"role": "tool"` entries in the provider wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}
