use super::error::ProtocolError;
use super::logging::{debug_payload_enabled, emit_debug_payload};
use super::stream::{decode_stream, DecodeSummary};
use crate::config::Config;
use crate::types::ProtocolEvent;
use crate::util::is_local_endpoint_url;
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProtocolError>> + Send>>;

/// Replaces the HTTP exchange with a canned byte stream (tests, replays).
pub trait StreamProducer: Send + Sync {
    fn open_stream(&self, payload: &Value) -> Result<ByteStream, ProtocolError>;
}

#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    endpoint_url: String,
    stream_producer: Option<Arc<dyn StreamProducer>>,
}

impl AgentClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self::with_http_client(http, config.endpoint_url.clone()))
    }

    pub fn with_http_client(http: reqwest::Client, endpoint_url: impl Into<String>) -> Self {
        Self {
            http,
            endpoint_url: endpoint_url.into(),
            stream_producer: None,
        }
    }

    pub fn with_stream_producer(
        endpoint_url: impl Into<String>,
        producer: Arc<dyn StreamProducer>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint_url: endpoint_url.into(),
            stream_producer: Some(producer),
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// POST `{"message": user_text}` and hand back the raw response body.
    pub async fn create_stream(&self, user_text: &str) -> Result<ByteStream, ProtocolError> {
        let payload = request_payload(user_text);
        if debug_payload_enabled() {
            emit_debug_payload(&self.endpoint_url, &payload);
        }

        if let Some(producer) = &self.stream_producer {
            return producer.open_stream(&payload);
        }

        let request_url = self.endpoint_url.clone();
        let response = self
            .http
            .post(&request_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_request_error(error, &request_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::Status {
                url: request_url,
                status,
            });
        }
        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(ProtocolError::NoBody { url: request_url });
        }

        tracing::debug!(url = %request_url, %status, "agent response stream opened");
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| ProtocolError::body(request_url.clone(), error)));
        Ok(Box::pin(stream))
    }

    /// Send one user message and deliver every decoded event to `on_event`.
    pub async fn decode<F>(
        &self,
        user_text: &str,
        cancel: &CancellationToken,
        on_event: F,
    ) -> Result<DecodeSummary, ProtocolError>
    where
        F: FnMut(ProtocolEvent),
    {
        let stream = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Ok(DecodeSummary { cancelled: true, ..DecodeSummary::default() });
            }
            opened = self.create_stream(user_text) => opened?,
        };

        let summary = decode_stream(stream, cancel, on_event).await?;
        if summary.malformed > 0 {
            tracing::warn!(
                events = summary.events,
                malformed = summary.malformed,
                "agent response contained undecodable lines"
            );
        }
        Ok(summary)
    }
}

pub fn request_payload(user_text: &str) -> Value {
    json!({ "message": user_text })
}

fn map_request_error(error: reqwest::Error, request_url: &str) -> ProtocolError {
    let url = request_url.to_string();
    if error.is_connect() {
        if is_local_endpoint_url(request_url) {
            tracing::warn!(url = %request_url, "local agent endpoint is not accepting connections");
        }
        return ProtocolError::Connect { url, source: error };
    }
    if error.is_timeout() {
        return ProtocolError::Timeout { url, source: error };
    }
    if let Some(status) = error.status() {
        return ProtocolError::Status { url, status };
    }
    ProtocolError::Request { url, source: error }
}
