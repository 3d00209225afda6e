//! Request payloads and enumerations for the `ip/...` API.
//!
//! # Design
//! Responses are never decoded here; callers receive the raw body. Only the
//! small payloads sent by `PUT`/`POST` operations are typed, so their JSON
//! field names are pinned by serde attributes rather than string literals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-side spam classification of an IP within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpamState {
    BlockedForSpam,
    Unblocked,
    Unblocking,
}

impl SpamState {
    pub const ALL: [SpamState; 3] = [
        SpamState::BlockedForSpam,
        SpamState::Unblocked,
        SpamState::Unblocking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpamState::BlockedForSpam => "blockedForSpam",
            SpamState::Unblocked => "unblocked",
            SpamState::Unblocking => "unblocking",
        }
    }
}

impl fmt::Display for SpamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the wire names of `SpamState`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown spam state: {0:?}")]
pub struct UnknownSpamState(pub String);

impl FromStr for SpamState {
    type Err = UnknownSpamState;

    /// Exact, case-sensitive match against the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpamState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownSpamState(s.to_string()))
    }
}

/// Body of `PUT ip/{block}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockProperties {
    pub description: String,
}

/// Body of `POST ip/{block}/reverse`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReverseAssignment {
    pub ip_reverse: String,
    pub reverse: String,
}

/// Body of `POST ip/{block}/move`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockMove {
    pub to: String,
}
