//! Blocking `HttpClient` backed by ureq.
//!
//! # Design
//! Status codes are returned as data (`http_status_as_error(false)`), so the
//! client decides what a failing status means. Only connection-level
//! problems become `TransportError`. Authentication is whatever the caller
//! puts in the default headers; signing schemes are out of scope here.
//! Response bodies are read without a size cap unless one is configured.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::trace;

use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, TransportError};

/// Settings for `UreqClient`, loadable from any serde format.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TransportConfig {
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Sent with every request, e.g. application keys.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Largest response body accepted, in bytes. Unlimited when unset.
    #[serde(default)]
    pub body_limit: Option<u64>,
}

#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
    base_url: String,
    headers: Vec<(String, String)>,
    body_limit: u64,
}

impl UreqClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: agent(None),
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: Vec::new(),
            body_limit: u64::MAX,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            agent: agent(config.timeout_secs.map(Duration::from_secs)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body_limit: config.body_limit.unwrap_or(u64::MAX),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = agent(Some(timeout));
        self
    }

    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the API root.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for UreqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqClient")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers.len())
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

fn agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .new_agent()
}

/// Default headers first, minus any name the request sets itself.
fn merge_headers(
    defaults: &[(String, String)],
    request: &[(String, String)],
) -> Vec<(String, String)> {
    defaults
        .iter()
        .filter(|(name, _)| !request.iter().any(|(own, _)| own.eq_ignore_ascii_case(name)))
        .chain(request.iter())
        .cloned()
        .collect()
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl HttpClient for UreqClient {
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.path);
        trace!(method = %request.method, %url, "sending request");

        let headers = merge_headers(&self.headers, &request.headers);

        let result = match (request.method, request.body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&url), &headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(&url), &headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), &headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(&url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(&url), &headers).send_empty(),
        };

        let mut response = result.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_string()
            .map_err(transport_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(err: ureq::Error) -> TransportError {
    let code = match &err {
        ureq::Error::StatusCode(code) => Some(*code),
        _ => None,
    };
    let mapped = TransportError::new(err.to_string());
    let mapped = match code {
        Some(code) => mapped.with_code(code),
        None => mapped,
    };
    mapped.with_source(err)
}
