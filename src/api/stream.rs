use super::error::{DecodeError, ProtocolError};
use super::logging::{emit_decode_error, emit_trailing_fragment};
use crate::types::ProtocolEvent;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Incremental UTF-8 decoder. An incomplete multi-byte sequence at the end of
/// a chunk is held back until the next call; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let joined;
        let mut rest: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            self.pending.extend_from_slice(chunk);
            joined = std::mem::take(&mut self.pending);
            &joined
        };

        let mut out = String::with_capacity(rest.len());
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(error) => {
                    let (valid, after) = rest.split_at(error.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match error.error_len() {
                        Some(invalid_len) => {
                            out.push(REPLACEMENT_CHAR);
                            rest = &after[invalid_len..];
                        }
                        None => {
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// End of input: a held-back partial sequence can no longer complete.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT_CHAR.to_string()
        }
    }
}

/// Splits a chunked NDJSON body into events. Holds at most one partial line.
#[derive(Debug, Default)]
pub struct NdjsonParser {
    decoder: Utf8Decoder,
    buffer: String,
}

impl NdjsonParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<Result<ProtocolEvent, DecodeError>> {
        let text = self.decoder.decode(chunk);
        self.buffer.push_str(&text);

        let mut outcomes = Vec::new();
        let mut start = 0;
        while let Some(end) = self.buffer[start..].find('\n') {
            let line_end = start + end;
            if let Some(outcome) = parse_candidate(&self.buffer[start..line_end]) {
                outcomes.push(outcome);
            }
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        outcomes
    }

    /// Bytes of text currently held as an unterminated line.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Flush at end of body. A final line without a trailing newline is still
    /// delivered when it is complete JSON; anything else is a dropped fragment.
    pub fn finish(mut self) -> Option<Result<ProtocolEvent, DecodeError>> {
        let tail = self.decoder.finish();
        self.buffer.push_str(&tail);

        let residual = self.buffer.trim();
        if residual.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(residual) {
            Ok(value) => Some(classify(value, residual)),
            Err(_) => {
                emit_trailing_fragment(residual);
                None
            }
        }
    }
}

fn parse_candidate(raw: &str) -> Option<Result<ProtocolEvent, DecodeError>> {
    let line = raw.strip_suffix('\r').unwrap_or(raw);
    if line.trim().is_empty() {
        return None;
    }
    Some(parse_line(line))
}

/// Strict parse of one complete line.
pub fn parse_line(line: &str) -> Result<ProtocolEvent, DecodeError> {
    let value = serde_json::from_str::<Value>(line).map_err(|source| DecodeError::Json {
        line: line.to_string(),
        source,
    })?;
    classify(value, line)
}

fn classify(value: Value, line: &str) -> Result<ProtocolEvent, DecodeError> {
    let Some(object) = value.as_object() else {
        return Err(DecodeError::NotAnObject {
            line: line.to_string(),
        });
    };
    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return Err(DecodeError::MissingType {
            line: line.to_string(),
        });
    };
    if !ProtocolEvent::is_known_type(kind) {
        return Err(DecodeError::UnknownType {
            kind: kind.to_string(),
            line: line.to_string(),
        });
    }

    let kind = kind.to_string();
    serde_json::from_value(value).map_err(|source| DecodeError::Shape {
        kind,
        line: line.to_string(),
        source,
    })
}

/// What happened while decoding one response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub events: usize,
    pub malformed: usize,
    pub cancelled: bool,
}

/// Drive `stream` to completion, handing each decoded event to `on_event` in
/// arrival order. Decode errors are logged and skipped; a transport error ends
/// decoding and is returned. Once `cancel` fires no further events are delivered.
pub async fn decode_stream<S, F>(
    mut stream: S,
    cancel: &CancellationToken,
    mut on_event: F,
) -> Result<DecodeSummary, ProtocolError>
where
    S: Stream<Item = Result<Bytes, ProtocolError>> + Unpin,
    F: FnMut(ProtocolEvent),
{
    let mut parser = NdjsonParser::new();
    let mut summary = DecodeSummary::default();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                summary.cancelled = true;
                tracing::debug!(delivered = summary.events, "decode cancelled");
                return Ok(summary);
            }
            next = stream.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk?;

        for outcome in parser.process(&chunk) {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                return Ok(summary);
            }
            deliver(outcome, &mut summary, &mut on_event);
        }
    }

    if let Some(outcome) = parser.finish() {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            return Ok(summary);
        }
        deliver(outcome, &mut summary, &mut on_event);
    }

    Ok(summary)
}

fn deliver<F>(
    outcome: Result<ProtocolEvent, DecodeError>,
    summary: &mut DecodeSummary,
    on_event: &mut F,
) where
    F: FnMut(ProtocolEvent),
{
    match outcome {
        Ok(event) => {
            summary.events += 1;
            on_event(event);
        }
        Err(error) => {
            summary.malformed += 1;
            emit_decode_error(&error);
        }
    }
}
