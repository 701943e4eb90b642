use super::client::{ByteStream, StreamProducer};
use super::error::ProtocolError;
use bytes::Bytes;
use futures::stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

const SCRIPTED_URL: &str = "scripted://agent";

/// One canned response body.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Chunks(Vec<Bytes>),
    /// Delivers `chunks`, then fails mid-body with `error`.
    Truncated { chunks: Vec<Bytes>, error: String },
    NoBody,
}

impl ScriptedResponse {
    /// One chunk per line, each newline-terminated.
    pub fn lines(lines: &[&str]) -> Self {
        Self::Chunks(
            lines
                .iter()
                .map(|line| Bytes::from(format!("{line}\n")))
                .collect(),
        )
    }

    /// The whole body split into fixed-size byte chunks.
    pub fn split_every(body: &str, chunk_len: usize) -> Self {
        Self::Chunks(
            body.as_bytes()
                .chunks(chunk_len.max(1))
                .map(Bytes::copy_from_slice)
                .collect(),
        )
    }
}

/// `StreamProducer` that replays scripted bodies in order and records the
/// request payloads it was asked to send.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedStream {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StreamProducer for ScriptedStream {
    fn open_stream(&self, payload: &Value) -> Result<ByteStream, ProtocolError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let chunks: Vec<Result<Bytes, ProtocolError>> = match next {
            Some(ScriptedResponse::Chunks(chunks)) => chunks.into_iter().map(Ok).collect(),
            Some(ScriptedResponse::Truncated { chunks, error }) => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(ProtocolError::body(SCRIPTED_URL, error))))
                .collect(),
            Some(ScriptedResponse::NoBody) | None => {
                return Err(ProtocolError::NoBody {
                    url: SCRIPTED_URL.to_string(),
                })
            }
        };

        Ok(Box::pin(stream::iter(chunks)))
    }
}
