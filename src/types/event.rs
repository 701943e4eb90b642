use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the agent's NDJSON response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Chat text fragment.
    Message { role: String, content: String },
    /// Directive to render the named widget with `props`.
    UpdateUi { component: String, props: Value },
    ToolCall { tool: String, args: Value },
    ToolResult { id: String, result: Value },
}

impl ProtocolEvent {
    /// Wire `type` values this client understands.
    pub const KNOWN_TYPES: [&'static str; 4] = ["message", "update_ui", "tool_call", "tool_result"];

    pub fn is_known_type(kind: &str) -> bool {
        Self::KNOWN_TYPES.contains(&kind)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::UpdateUi { .. } => "update_ui",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn update_ui(component: impl Into<String>, props: Value) -> Self {
        Self::UpdateUi {
            component: component.into(),
            props,
        }
    }
}
