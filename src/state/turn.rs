use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnPayload {
    Text { text: String },
    Ui { component: String, props: Value },
}

/// One entry in the conversation. Turns are replaced, never edited in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub payload: TurnPayload,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            payload: TurnPayload::Text { text: text.into() },
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            payload: TurnPayload::Text { text: text.into() },
        }
    }

    pub fn assistant_ui(component: impl Into<String>, props: Value) -> Self {
        Self {
            role: Role::Assistant,
            payload: TurnPayload::Ui {
                component: component.into(),
                props,
            },
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            TurnPayload::Text { text } => Some(text),
            TurnPayload::Ui { .. } => None,
        }
    }

    /// Text of an assistant text turn; `None` for user turns and UI turns.
    pub fn assistant_text(&self) -> Option<&str> {
        match self.role {
            Role::Assistant => self.text(),
            Role::User => None,
        }
    }
}
