use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::time::Duration;

use crate::state::MergePolicy;

const DEFAULT_ENDPOINT: &str = "http://localhost:8000/agent";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint_url: String,
    pub merge_policy: MergePolicy,
    /// Only bounds connection setup; a response body may stream indefinitely.
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            merge_policy: MergePolicy::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let endpoint_url = std::env::var("AGUI_ENDPOINT")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let merge_policy = match std::env::var("AGUI_MERGE_POLICY") {
            Ok(value) => match MergePolicy::parse(&value) {
                Some(policy) => policy,
                None => bail!("Invalid AGUI_MERGE_POLICY '{value}': expected 'append' or 'create'"),
            },
            Err(_) => MergePolicy::default(),
        };

        let connect_timeout = match std::env::var("AGUI_CONNECT_TIMEOUT_SECS") {
            Ok(value) => Duration::from_secs(
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid AGUI_CONNECT_TIMEOUT_SECS '{value}'"))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            endpoint_url,
            merge_policy,
            connect_timeout,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint_url)
            .with_context(|| format!("Invalid AGUI_ENDPOINT '{}'", self.endpoint_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "Invalid AGUI_ENDPOINT '{}': expected http:// or https:// URL",
                self.endpoint_url
            );
        }

        if self.connect_timeout.is_zero() {
            bail!("AGUI_CONNECT_TIMEOUT_SECS must be greater than zero");
        }

        Ok(())
    }
}
