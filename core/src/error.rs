//! Error types for the IP-block client.
//!
//! # Design
//! Validation failures are reported before any request leaves the client and
//! get their own variants. Everything that goes wrong after dispatch lands in
//! `Operation`, which keeps the collaborator's message and code and chains
//! the original cause. "Not found" is not singled out; callers inspect
//! `code()` if they need that distinction.

use std::error::Error as StdError;

use thiserror::Error;

use crate::http::{HttpResponse, TransportError};

/// Errors returned by `IpBlockClient` operations.
#[derive(Debug, Error)]
pub enum IpError {
    /// A required parameter was empty. No request was sent.
    #[error("parameter `{0}` is missing")]
    MissingParameter(&'static str),

    /// A parameter is outside its closed set of values. No request was sent.
    #[error("parameter `{name}` is invalid: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    /// The request failed in transport, encoding, or with a non-2xx status.
    #[error("ip operation failed: {message}")]
    Operation {
        message: String,
        code: Option<u16>,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl IpError {
    /// Status or transport code of an `Operation` failure.
    pub fn code(&self) -> Option<u16> {
        match self {
            IpError::Operation { code, .. } => *code,
            _ => None,
        }
    }

    pub(crate) fn invalid(name: &'static str, value: &str) -> Self {
        IpError::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }

    pub(crate) fn encoding(err: serde_json::Error) -> Self {
        IpError::Operation {
            message: err.to_string(),
            code: None,
            source: Some(Box::new(err)),
        }
    }

    /// A response the collaborator returned as data but with a failing status.
    pub(crate) fn status(response: HttpResponse) -> Self {
        IpError::Operation {
            message: response.body,
            code: Some(response.status),
            source: None,
        }
    }
}

impl From<TransportError> for IpError {
    fn from(err: TransportError) -> Self {
        IpError::Operation {
            message: err.message().to_string(),
            code: err.code(),
            source: Some(Box::new(err)),
        }
    }
}
