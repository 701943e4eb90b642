//! Property tests for the NDJSON decoder: how the body is cut into chunks
//! must never change which events come out.

use super::error::ProtocolError;
use super::stream::{decode_stream, NdjsonParser};
use crate::types::ProtocolEvent;
use bytes::Bytes;
use futures::stream;
use proptest::prelude::*;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn arb_text() -> impl Strategy<Value = String> {
    // Mix ASCII with two-, three- and four-byte characters.
    "[a-zA-Z0-9 .,!?éß€中😀\"\\\\]{0,24}"
}

fn arb_props() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({})),
        arb_text().prop_map(|title| json!({ "title": title })),
        prop::collection::vec(arb_text(), 0..4).prop_map(|cells| json!({ "headers": cells })),
    ]
}

fn arb_event() -> impl Strategy<Value = ProtocolEvent> {
    prop_oneof![
        arb_text().prop_map(ProtocolEvent::message),
        ("[a-z_]{1,12}", arb_props())
            .prop_map(|(component, props)| ProtocolEvent::update_ui(component, props)),
        ("[a-z_]{1,12}", arb_props())
            .prop_map(|(tool, args)| ProtocolEvent::ToolCall { tool, args }),
        ("[a-z0-9_]{1,12}", arb_props())
            .prop_map(|(id, result)| ProtocolEvent::ToolResult { id, result }),
    ]
}

fn encode_body(events: &[ProtocolEvent], trailing_newline: bool) -> Vec<u8> {
    let lines: Vec<String> = events
        .iter()
        .map(|event| serde_json::to_string(event).expect("event serializes"))
        .collect();
    let mut body = lines.join("\n");
    if trailing_newline && !body.is_empty() {
        body.push('\n');
    }
    body.into_bytes()
}

fn split_at_points(body: &[u8], mut points: Vec<usize>) -> Vec<Bytes> {
    points.iter_mut().for_each(|p| *p %= body.len() + 1);
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(Bytes::copy_from_slice(&body[start..point]));
        start = point;
    }
    chunks.push(Bytes::copy_from_slice(&body[start..]));
    chunks
}

fn decode_chunks(chunks: Vec<Bytes>) -> Vec<ProtocolEvent> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    runtime.block_on(async {
        let mut events = Vec::new();
        let items: Vec<Result<Bytes, ProtocolError>> = chunks.into_iter().map(Ok).collect();
        decode_stream(stream::iter(items), &CancellationToken::new(), |event| {
            events.push(event)
        })
        .await
        .expect("scripted stream cannot fail");
        events
    })
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_events(
        events in prop::collection::vec(arb_event(), 0..12),
        trailing_newline in any::<bool>(),
        points in prop::collection::vec(any::<usize>(), 0..24),
    ) {
        let body = encode_body(&events, trailing_newline);
        let whole = decode_chunks(vec![Bytes::from(body.clone())]);
        let split = decode_chunks(split_at_points(&body, points));

        prop_assert_eq!(&whole, &events);
        prop_assert_eq!(&split, &events);
    }

    #[test]
    fn prop_one_byte_at_a_time_matches_single_chunk(
        events in prop::collection::vec(arb_event(), 1..6),
    ) {
        let body = encode_body(&events, true);
        let mut parser = NdjsonParser::new();
        let mut decoded = Vec::new();
        for byte in &body {
            decoded.extend(parser.process(std::slice::from_ref(byte)).into_iter().filter_map(Result::ok));
            prop_assert!(parser.buffered_len() <= body.len());
        }
        prop_assert_eq!(parser.buffered_len(), 0);
        prop_assert_eq!(decoded, events);
    }

    #[test]
    fn prop_malformed_line_never_blocks_neighbours(
        before in arb_event(),
        after in arb_event(),
        garbage in "[a-z{}:,\\[\\] ]{1,20}",
    ) {
        let mut body = encode_body(std::slice::from_ref(&before), true);
        body.extend_from_slice(garbage.as_bytes());
        body.push(b'\n');
        body.extend_from_slice(&encode_body(std::slice::from_ref(&after), true));

        let decoded = decode_chunks(vec![Bytes::from(body)]);
        prop_assert_eq!(decoded.first(), Some(&before));
        prop_assert_eq!(decoded.last(), Some(&after));
    }
}
