use agui::api::mock_client::{ScriptedResponse, ScriptedStream};
use agui::api::{AgentClient, ProtocolError};
use agui::dispatch::ComponentRegistry;
use agui::state::{Conversation, ConversationTurn, ConversationUpdate, MergePolicy, Role};
use agui::ui::render::TranscriptPrinter;
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const ENDPOINT: &str = "http://localhost:8000/agent";

fn conversation(policy: MergePolicy, responses: Vec<ScriptedResponse>) -> (Conversation, Arc<ScriptedStream>) {
    let script = Arc::new(ScriptedStream::new(responses));
    let client = AgentClient::with_stream_producer(ENDPOINT, script.clone());
    (Conversation::new(client, policy), script)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ConversationUpdate>) -> Vec<ConversationUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

#[tokio::test]
async fn test_text_then_widget_then_text() {
    let (mut conversation, script) = conversation(
        MergePolicy::Append,
        vec![ScriptedResponse::lines(&[
            r#"{"type":"message","role":"assistant","content":"Here is "}"#,
            r#"{"type":"message","role":"assistant","content":"a card:"}"#,
            r#"{"type":"update_ui","component":"card","props":{"title":"Ada"}}"#,
            r#"{"type":"message","role":"assistant","content":"Anything else?"}"#,
        ])],
    );

    let summary = conversation
        .send_message("show me".into(), None, &CancellationToken::new())
        .await
        .expect("scripted turn");

    assert_eq!(summary.events, 4);
    assert_eq!(
        *conversation.turns(),
        vec![
            ConversationTurn::user("show me"),
            ConversationTurn::assistant("Here is a card:"),
            ConversationTurn::assistant_ui("card", json!({"title": "Ada"})),
            ConversationTurn::assistant("Anything else?"),
        ]
    );
    assert_eq!(script.requests(), vec![json!({"message": "show me"})]);
}

#[tokio::test]
async fn test_always_create_policy_splits_messages() {
    let (mut conversation, _) = conversation(
        MergePolicy::AlwaysCreate,
        vec![ScriptedResponse::lines(&[
            r#"{"type":"message","role":"assistant","content":"A"}"#,
            r#"{"type":"message","role":"assistant","content":"B"}"#,
        ])],
    );

    conversation
        .send_message("q".into(), None, &CancellationToken::new())
        .await
        .expect("scripted turn");

    let turns = conversation.turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].text(), Some("A"));
    assert_eq!(turns[2].text(), Some("B"));
}

#[tokio::test]
async fn test_second_turn_starts_new_assistant_text() {
    let (mut conversation, _) = conversation(
        MergePolicy::Append,
        vec![
            ScriptedResponse::lines(&[r#"{"type":"message","role":"assistant","content":"one"}"#]),
            ScriptedResponse::lines(&[r#"{"type":"message","role":"assistant","content":"two"}"#]),
        ],
    );
    let cancel = CancellationToken::new();

    conversation.send_message("a".into(), None, &cancel).await.expect("first");
    conversation.send_message("b".into(), None, &cancel).await.expect("second");

    let roles: Vec<Role> = conversation.turns().iter().map(|turn| turn.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(conversation.turns()[3].text(), Some("two"));
}

#[tokio::test]
async fn test_updates_follow_every_event_in_order() {
    let (mut conversation, _) = conversation(
        MergePolicy::Append,
        vec![ScriptedResponse::lines(&[
            r#"{"type":"tool_call","tool":"lookup","args":{}}"#,
            r#"{"type":"message","role":"assistant","content":"x"}"#,
        ])],
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    conversation
        .send_message("q".into(), Some(&tx), &CancellationToken::new())
        .await
        .expect("scripted turn");

    let kinds: Vec<&str> = drain(&mut rx)
        .iter()
        .map(|update| match update {
            ConversationUpdate::TurnStarted => "started",
            ConversationUpdate::Event(event) => event.type_name(),
            ConversationUpdate::TurnsChanged(_) => "turns",
            ConversationUpdate::TurnComplete(_) => "complete",
            ConversationUpdate::Error(_) => "error",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["turns", "started", "tool_call", "turns", "message", "turns", "complete"]
    );
}

#[tokio::test]
async fn test_malformed_lines_are_counted_not_fatal() {
    let (mut conversation, _) = conversation(
        MergePolicy::Append,
        vec![ScriptedResponse::lines(&[
            r#"{"type":"message","role":"assistant","content":"a"}"#,
            r#"{"type":"mystery"}"#,
            "{broken",
            r#"{"type":"message","role":"assistant","content":"b"}"#,
        ])],
    );

    let summary = conversation
        .send_message("q".into(), None, &CancellationToken::new())
        .await
        .expect("malformed lines do not fail the turn");

    assert_eq!(summary.events, 2);
    assert_eq!(summary.malformed, 2);
    assert_eq!(conversation.turns()[1].text(), Some("ab"));
}

#[tokio::test]
async fn test_truncated_body_keeps_applied_turns_and_clears_busy() {
    let (mut conversation, _) = conversation(
        MergePolicy::Append,
        vec![ScriptedResponse::Truncated {
            chunks: vec![Bytes::from_static(
                b"{\"type\":\"message\",\"role\":\"assistant\",\"content\":\"partial\"}\n",
            )],
            error: "connection reset by peer".into(),
        }],
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = conversation
        .send_message("q".into(), Some(&tx), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ProtocolError::Body { .. })));
    assert!(!conversation.is_busy());
    assert_eq!(
        *conversation.turns(),
        vec![ConversationTurn::user("q"), ConversationTurn::assistant("partial")]
    );

    let errors: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|update| match update {
            ConversationUpdate::Error(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("connection reset by peer"));
}

#[tokio::test]
async fn test_missing_body_leaves_only_user_turn() {
    let (mut conversation, _) = conversation(MergePolicy::Append, vec![ScriptedResponse::NoBody]);
    let busy = conversation.busy_handle();

    let result = conversation
        .send_message("hello?".into(), None, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ProtocolError::NoBody { .. })));
    assert!(!busy.is_busy());
    assert_eq!(*conversation.turns(), vec![ConversationTurn::user("hello?")]);
}

#[tokio::test]
async fn test_cancel_before_send_applies_no_events() {
    let (mut conversation, script) = conversation(
        MergePolicy::Append,
        vec![ScriptedResponse::lines(&[
            r#"{"type":"message","role":"assistant","content":"late"}"#,
        ])],
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = conversation
        .send_message("q".into(), None, &cancel)
        .await
        .expect("cancellation is not an error");

    assert!(summary.cancelled);
    assert!(script.requests().is_empty());
    assert_eq!(*conversation.turns(), vec![ConversationTurn::user("q")]);
}

#[tokio::test]
async fn test_snapshots_render_incrementally() {
    let (mut conversation, _) = conversation(
        MergePolicy::Append,
        vec![ScriptedResponse::split_every(
            concat!(
                r#"{"type":"message","role":"assistant","content":"Top "}"#, "\n",
                r#"{"type":"message","role":"assistant","content":"cities"}"#, "\n",
                r#"{"type":"update_ui","component":"steps","props":{"items":[{"title":"Go","status":"current"}]}}"#, "\n",
                r#"{"type":"update_ui","component":"globe","props":{}}"#, "\n",
            ),
            9,
        )],
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    conversation
        .send_message("cities?".into(), Some(&tx), &CancellationToken::new())
        .await
        .expect("scripted turn");

    let mut printer = TranscriptPrinter::new(Arc::new(ComponentRegistry::with_builtin_widgets()));
    let mut transcript = String::new();
    for update in drain(&mut rx) {
        if let ConversationUpdate::TurnsChanged(snapshot) = update {
            transcript.push_str(&printer.advance(&snapshot));
        }
    }
    transcript.push_str(&printer.finish());

    assert_eq!(
        transcript,
        "you> cities?\n\
         agent> Top cities\n\
         agent>\n  [>] Go\n\
         agent>\n  unsupported component: globe\n"
    );
}
