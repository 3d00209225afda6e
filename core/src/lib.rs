//! Client binding for a hosting provider's IP-block management API.
//!
//! # Overview
//! Covers block properties, ARP, reverse DNS, spam-block state and block
//! relocation under the `ip/...` namespace. Each operation validates its
//! parameters, builds an `HttpRequest` and forwards it to an injected
//! `HttpClient`; the raw response body comes back unparsed.
//!
//! # Design
//! - `IpBlockClient` is stateless apart from its collaborator, so one
//!   instance can be shared across threads.
//! - Operations come in pairs: `build_*` (pure, produces the request) and
//!   the operation itself (dispatches and returns the body).
//! - `UreqClient` is the bundled blocking transport; any `HttpClient`
//!   implementation can replace it, including one that signs requests.
//!
//! ```no_run
//! use ipblock_core::{IpBlockClient, UreqClient};
//!
//! let http = UreqClient::new("https://eu.api.example.com/1.0")
//!     .with_header("X-Application-Key", "app-key");
//! let client = IpBlockClient::new(http);
//! let json = client.get_reverse("1.2.3.0/24")?;
//! println!("{json}");
//! # Ok::<(), ipblock_core::IpError>(())
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::IpBlockClient;
pub use error::IpError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, TransportError, JSON_CONTENT_TYPE};
pub use transport::{TransportConfig, UreqClient};
pub use types::{BlockMove, BlockProperties, ReverseAssignment, SpamState, UnknownSpamState};
