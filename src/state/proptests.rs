//! Property tests for the turn reducer.

use super::reducer::{apply_event_with, replay, MergePolicy};
use super::turn::{ConversationTurn, Role, TurnPayload};
use crate::types::ProtocolEvent;
use proptest::prelude::*;
use serde_json::json;

fn arb_policy() -> impl Strategy<Value = MergePolicy> {
    prop_oneof![Just(MergePolicy::Append), Just(MergePolicy::AlwaysCreate)]
}

fn arb_event() -> impl Strategy<Value = ProtocolEvent> {
    prop_oneof![
        4 => "[a-zé€ ]{0,8}".prop_map(ProtocolEvent::message),
        2 => "[a-z]{1,8}".prop_map(|name| ProtocolEvent::update_ui(name, json!({}))),
        1 => "[a-z]{1,8}".prop_map(|tool| ProtocolEvent::ToolCall { tool, args: json!({}) }),
        1 => "[a-z0-9]{1,8}".prop_map(|id| ProtocolEvent::ToolResult { id, result: json!(null) }),
    ]
}

fn arb_initial() -> impl Strategy<Value = Vec<ConversationTurn>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{0,6}".prop_map(ConversationTurn::user),
            "[a-z]{0,6}".prop_map(ConversationTurn::assistant),
            "[a-z]{1,6}".prop_map(|name| ConversationTurn::assistant_ui(name, json!({}))),
        ],
        0..4,
    )
}

fn total_message_text(events: &[ProtocolEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            ProtocolEvent::Message { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

fn new_assistant_text(initial: &[ConversationTurn], turns: &[ConversationTurn]) -> String {
    // The merge may have extended the last initial turn; strip its old text.
    let prefix_len = initial.len().saturating_sub(1);
    let mut text: String = turns[prefix_len..]
        .iter()
        .filter_map(ConversationTurn::assistant_text)
        .collect();
    if let Some(old) = initial.last().and_then(ConversationTurn::assistant_text) {
        text.replace_range(..old.len(), "");
    }
    text
}

proptest! {
    #[test]
    fn prop_replay_is_deterministic(
        policy in arb_policy(),
        initial in arb_initial(),
        events in prop::collection::vec(arb_event(), 0..16),
    ) {
        prop_assert_eq!(
            replay(policy, &initial, &events),
            replay(policy, &initial, &events)
        );
    }

    #[test]
    fn prop_apply_never_rewrites_history(
        policy in arb_policy(),
        initial in arb_initial(),
        event in arb_event(),
    ) {
        let next = apply_event_with(policy, &initial, &event);
        prop_assert!(next.len() >= initial.len());
        prop_assert!(next.len() <= initial.len() + 1);

        // Everything except a possibly-extended last turn is unchanged.
        let stable = initial.len().saturating_sub(1);
        prop_assert_eq!(&next[..stable], &initial[..stable]);
        // Only assistant turns are added.
        prop_assert!(next[initial.len()..].iter().all(|turn| turn.role == Role::Assistant));
    }

    #[test]
    fn prop_message_text_is_preserved_in_order(
        policy in arb_policy(),
        initial in arb_initial(),
        events in prop::collection::vec(arb_event(), 0..16),
    ) {
        let turns = replay(policy, &initial, &events);
        prop_assert_eq!(new_assistant_text(&initial, &turns), total_message_text(&events));
    }

    #[test]
    fn prop_every_ui_event_yields_its_own_turn(
        policy in arb_policy(),
        events in prop::collection::vec(arb_event(), 0..16),
    ) {
        let turns = replay(policy, &[], &events);
        let ui_events = events
            .iter()
            .filter(|event| matches!(event, ProtocolEvent::UpdateUi { .. }))
            .count();
        let ui_turns = turns
            .iter()
            .filter(|turn| matches!(turn.payload, TurnPayload::Ui { .. }))
            .count();
        prop_assert_eq!(ui_events, ui_turns);
    }
}
