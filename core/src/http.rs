//! HTTP collaborator seam for the IP-block client.
//!
//! # Design
//! Requests and responses are plain data. `IpBlockClient` builds an
//! `HttpRequest` and hands it to an injected `HttpClient`, which owns the
//! connection, base URL, authentication headers, TLS and any retry policy.
//! Paths are relative to the provider's API root (`ip/...`).
//!
//! All fields use owned types (`String`, `Vec`) so requests can be recorded,
//! compared and replayed in tests without lifetime concerns.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Header attached to every request that carries a JSON payload.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `IpBlockClient::build_*` methods and executed by an `HttpClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Attach a JSON body together with its content type.
    pub fn with_json(mut self, body: String) -> Self {
        self.headers
            .push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure raised by an `HttpClient` while executing a request.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    code: Option<u16>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status or transport-specific code, when one is known.
    pub fn code(&self) -> Option<u16> {
        self.code
    }
}

/// The transport collaborator `IpBlockClient` forwards every call to.
///
/// Implementations decide how non-2xx statuses are reported: returning them
/// as data or as a `TransportError` with a `code` both end up as an
/// `IpError::Operation` at the client.
pub trait HttpClient: Send + Sync {
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    fn get(&self, path: &str) -> Result<HttpResponse, TransportError> {
        self.request(HttpRequest::new(HttpMethod::Get, path))
    }

    fn put(
        &self,
        path: &str,
        headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> Result<HttpResponse, TransportError> {
        self.request(HttpRequest {
            method: HttpMethod::Put,
            path: path.to_string(),
            headers,
            body,
        })
    }

    fn post(
        &self,
        path: &str,
        headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> Result<HttpResponse, TransportError> {
        self.request(HttpRequest {
            method: HttpMethod::Post,
            path: path.to_string(),
            headers,
            body,
        })
    }

    fn delete(&self, path: &str) -> Result<HttpResponse, TransportError> {
        self.request(HttpRequest::new(HttpMethod::Delete, path))
    }
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).request(request)
    }
}

impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).request(request)
    }
}

impl<T: HttpClient + ?Sized> HttpClient for Box<T> {
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).request(request)
    }
}
