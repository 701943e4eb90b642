mod conversation;
mod reducer;
mod turn;

#[cfg(test)]
mod proptests;

pub use conversation::{BusyHandle, Conversation, ConversationUpdate, TurnSnapshot};
pub use reducer::{apply_event, apply_event_with, replay, MergePolicy};
pub use turn::{ConversationTurn, Role, TurnPayload};
