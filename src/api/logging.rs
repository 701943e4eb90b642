use super::error::DecodeError;
use crate::util::{parse_bool_str, truncate_for_log};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEBUG_PAYLOAD_ENV: &str = "AGUI_DEBUG_PAYLOAD";
const LOG_PATH_ENV: &str = "AGUI_LOG_PATH";
const LOG_FILTER_ENV: &str = "AGUI_LOG";
const DEFAULT_LOG_FILTER: &str = "agui=info";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(|v| parse_bool_str(&v))
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::info!(url = request_url, payload = %formatted_payload, "agent request payload");
}

pub fn emit_decode_error(error: &DecodeError) {
    tracing::warn!(
        error = %error,
        line = %truncate_for_log(error.line()),
        "skipping undecodable event line"
    );
}

pub fn emit_trailing_fragment(fragment: &str) {
    tracing::debug!(
        fragment = %truncate_for_log(fragment),
        "discarding incomplete trailing fragment"
    );
}

/// Install the global subscriber. Logs go to `AGUI_LOG_PATH` when set so
/// they do not interleave with the transcript on stdout.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let installed = match resolve_log_path() {
        Some(path) => {
            let file = open_log_file(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|error| anyhow!("failed to install log subscriber: {error}"))
}

fn open_log_file(path: &str) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{path}'"))
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
