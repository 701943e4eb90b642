use super::turn::ConversationTurn;
use crate::types::ProtocolEvent;
use serde::{Deserialize, Serialize};

/// How a `message` event lands in the turn sequence.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Extend the last assistant text turn; start a new one after a user or UI turn.
    #[default]
    Append,
    /// Every `message` event becomes its own assistant turn.
    AlwaysCreate,
}

impl MergePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "append" | "merge" => Some(Self::Append),
            "create" | "always_create" | "always-create" => Some(Self::AlwaysCreate),
            _ => None,
        }
    }
}

/// Fold one event into `turns` under the default policy.
pub fn apply_event(turns: &[ConversationTurn], event: &ProtocolEvent) -> Vec<ConversationTurn> {
    apply_event_with(MergePolicy::default(), turns, event)
}

/// Pure transition: returns the next sequence, `turns` is left untouched.
/// Only assistant turns are ever produced here.
pub fn apply_event_with(
    policy: MergePolicy,
    turns: &[ConversationTurn],
    event: &ProtocolEvent,
) -> Vec<ConversationTurn> {
    let mut next = turns.to_vec();

    match event {
        ProtocolEvent::Message { content, .. } => {
            let merged = match (policy, turns.last().and_then(ConversationTurn::assistant_text)) {
                (MergePolicy::Append, Some(existing)) => Some(format!("{existing}{content}")),
                _ => None,
            };

            match merged {
                Some(text) => {
                    next.pop();
                    next.push(ConversationTurn::assistant(text));
                }
                None => next.push(ConversationTurn::assistant(content.clone())),
            }
        }
        ProtocolEvent::UpdateUi { component, props } => {
            next.push(ConversationTurn::assistant_ui(component.clone(), props.clone()));
        }
        ProtocolEvent::ToolCall { .. } | ProtocolEvent::ToolResult { .. } => {}
    }

    next
}

/// Fold a recorded event list left to right.
pub fn replay(
    policy: MergePolicy,
    initial: &[ConversationTurn],
    events: &[ProtocolEvent],
) -> Vec<ConversationTurn> {
    events.iter().fold(initial.to_vec(), |turns, event| {
        apply_event_with(policy, &turns, event)
    })
}
