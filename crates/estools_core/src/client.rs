use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

/// Error bodies longer than this are cut before being shown to the user.
/// The limit counts characters after surrounding whitespace is trimmed.
pub const ERROR_BODY_LIMIT: usize = 300;

pub trait ClusterApi {
    fn get_json(&mut self, url: &Url) -> Result<Value>;
    fn put_json(&mut self, url: &Url, body: &Value) -> Result<Value>;
    fn request_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticClientConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ElasticClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: crate::config::DEFAULT_TIMEOUT_MS,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub struct ElasticClient {
    client: Client,
    config: ElasticClientConfig,
    request_count: usize,
}

impl ElasticClient {
    pub fn new(config: ElasticClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build Elasticsearch HTTP client")?;

        Ok(Self {
            client,
            config,
            request_count: 0,
        })
    }
}

impl ClusterApi for ElasticClient {
    fn get_json(&mut self, url: &Url) -> Result<Value> {
        self.request_count += 1;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", self.config.user_agent.clone())
            .send()
            .with_context(|| format!("failed to call {url}"))?;
        decode_response(response, url)
    }

    fn put_json(&mut self, url: &Url, body: &Value) -> Result<Value> {
        self.request_count += 1;
        debug!(%url, "PUT");
        let response = self
            .client
            .put(url.clone())
            .header("User-Agent", self.config.user_agent.clone())
            .json(body)
            .send()
            .with_context(|| format!("failed to call {url}"))?;
        decode_response(response, url)
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Build `{addr}/{segments...}`, percent-encoding each segment.
pub fn endpoint(addr: &str, segments: &[&str]) -> Result<Url> {
    let trimmed = addr.trim();
    let mut url =
        Url::parse(trimmed).with_context(|| format!("invalid cluster address: {trimmed}"))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| anyhow!("cluster address cannot carry a path: {trimmed}"))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

pub fn truncate_error_body(body: &str, limit: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

fn decode_response(response: Response, url: &Url) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("failed to read response body from {url}"))?;
    parse_response_body(status, &body, url)
}

/// Anything but 200 is an error carrying the truncated body; 200 must be JSON.
pub fn parse_response_body(status: StatusCode, body: &str, url: &Url) -> Result<Value> {
    if status != StatusCode::OK {
        bail!(
            "HTTP {} from {url}: {}",
            status.as_u16(),
            truncate_error_body(body, ERROR_BODY_LIMIT)
        );
    }
    serde_json::from_str(body).with_context(|| format!("failed to decode JSON from {url}"))
}
