use reqwest::StatusCode;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Transport-level failure. Fatal to the current request, reported once.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("cannot reach agent endpoint '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to agent endpoint '{url}' timed out: {source}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("agent endpoint '{url}' returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("agent endpoint '{url}' returned no response body")]
    NoBody { url: String },
    #[error("response body from '{url}' failed mid-stream: {source}")]
    Body {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("request to agent endpoint '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("a request is already in flight for this conversation")]
    Busy,
}

impl ProtocolError {
    pub fn body(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Body {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// A complete line that could not be turned into a `ProtocolEvent`.
/// The line is skipped and decoding continues.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON line: {source}")]
    Json {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("line is not a JSON object")]
    NotAnObject { line: String },
    #[error("line has no string `type` field")]
    MissingType { line: String },
    #[error("unrecognized event type `{kind}`")]
    UnknownType { kind: String, line: String },
    #[error("`{kind}` event has the wrong shape: {source}")]
    Shape {
        kind: String,
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub fn line(&self) -> &str {
        match self {
            Self::Json { line, .. }
            | Self::NotAnObject { line }
            | Self::MissingType { line }
            | Self::UnknownType { line, .. }
            | Self::Shape { line, .. } => line,
        }
    }
}
