use std::collections::BTreeMap;

use anyhow::{Result, bail};
use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::client::{ClusterApi, parse_response_body};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

/// In-memory cluster keyed by `METHOD url`; unknown routes behave like a refused connection.
#[derive(Debug, Default)]
pub struct MockCluster {
    routes: BTreeMap<String, (u16, Value)>,
    pub requests: Vec<RecordedRequest>,
}

impl MockCluster {
    pub fn with_get(mut self, url: &str, status: u16, body: Value) -> Self {
        self.routes.insert(format!("GET {url}"), (status, body));
        self
    }

    pub fn with_put(mut self, url: &str, status: u16, body: Value) -> Self {
        self.routes.insert(format!("PUT {url}"), (status, body));
        self
    }

    fn respond(&mut self, method: &'static str, url: &Url, body: Option<&Value>) -> Result<Value> {
        self.requests.push(RecordedRequest {
            method,
            url: url.to_string(),
            body: body.cloned(),
        });
        let Some((status, response)) = self.routes.get(&format!("{method} {url}")) else {
            bail!("failed to call {url}: connection refused");
        };
        let status = StatusCode::from_u16(*status)?;
        parse_response_body(status, &response.to_string(), url)
    }
}

impl ClusterApi for MockCluster {
    fn get_json(&mut self, url: &Url) -> Result<Value> {
        self.respond("GET", url, None)
    }

    fn put_json(&mut self, url: &Url, body: &Value) -> Result<Value> {
        self.respond("PUT", url, Some(body))
    }

    fn request_count(&self) -> usize {
        self.requests.len()
    }
}
