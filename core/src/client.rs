//! IP-block client for the provider's `ip/...` REST namespace.
//!
//! # Design
//! `IpBlockClient` holds only its injected `HttpClient` and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that validates its parameters and produces an `HttpRequest`, and
//! the operation itself, which dispatches that request and returns the raw
//! response body. Validation failures never reach the collaborator.

use tracing::{debug, warn};
use url::form_urlencoded;

use crate::error::IpError;
use crate::http::{HttpClient, HttpMethod, HttpRequest};
use crate::types::{BlockMove, BlockProperties, ReverseAssignment, SpamState};

const ROOT: &str = "ip/";

/// Thin client over the provider's IP-block management API.
///
/// Every operation returns the response body exactly as the collaborator
/// delivered it, typically a JSON document. Parsing is left to the caller.
#[derive(Debug, Clone)]
pub struct IpBlockClient<C> {
    http: C,
}

impl<C: HttpClient> IpBlockClient<C> {
    pub fn new(http: C) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    pub fn into_inner(self) -> C {
        self.http
    }

    // -----------------------------------------------------------------------
    // Block properties
    // -----------------------------------------------------------------------

    pub fn build_get_block_properties(&self, ip_block: &str) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        Ok(HttpRequest::new(HttpMethod::Get, block_path(ip_block)))
    }

    pub fn get_block_properties(&self, ip_block: &str) -> Result<String, IpError> {
        self.dispatch(self.build_get_block_properties(ip_block)?)
    }

    pub fn build_set_block_properties(
        &self,
        ip_block: &str,
        description: &str,
    ) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("description", description)?;
        let body = to_json(&BlockProperties {
            description: description.to_string(),
        })?;
        Ok(HttpRequest::new(HttpMethod::Put, block_path(ip_block)).with_json(body))
    }

    /// Update the block description. The provider usually answers with an
    /// empty or `null` body.
    pub fn set_block_properties(&self, ip_block: &str, description: &str) -> Result<String, IpError> {
        self.dispatch(self.build_set_block_properties(ip_block, description)?)
    }

    // -----------------------------------------------------------------------
    // ARP
    // -----------------------------------------------------------------------

    pub fn build_get_block_arp(&self, ip_block: &str) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/arp", block_path(ip_block)),
        ))
    }

    pub fn get_block_arp(&self, ip_block: &str) -> Result<String, IpError> {
        self.dispatch(self.build_get_block_arp(ip_block)?)
    }

    pub fn build_get_blocked_info(&self, ip_block: &str, ip: &str) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ip", ip)?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/arp/{}", block_path(ip_block), encode(ip)),
        ))
    }

    /// ARP-blocking details for a single IP of the block.
    pub fn get_blocked_info(&self, ip_block: &str, ip: &str) -> Result<String, IpError> {
        self.dispatch(self.build_get_blocked_info(ip_block, ip)?)
    }

    // -----------------------------------------------------------------------
    // Reverse DNS
    // -----------------------------------------------------------------------

    pub fn build_get_reverse(&self, ip_block: &str) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/reverse/", block_path(ip_block)),
        ))
    }

    pub fn get_reverse(&self, ip_block: &str) -> Result<String, IpError> {
        self.dispatch(self.build_get_reverse(ip_block)?)
    }

    pub fn build_get_reverse_properties(
        &self,
        ip_block: &str,
        ip: &str,
    ) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ip", ip)?;
        Ok(HttpRequest::new(HttpMethod::Get, reverse_path(ip_block, ip)))
    }

    pub fn get_reverse_properties(&self, ip_block: &str, ip: &str) -> Result<String, IpError> {
        self.dispatch(self.build_get_reverse_properties(ip_block, ip)?)
    }

    /// `reverse` is sent as given, including when empty; neither the IP
    /// literal nor the trailing dot of the reverse name is checked locally.
    pub fn build_set_reverse_properties(
        &self,
        ip_block: &str,
        ip: &str,
        reverse: &str,
    ) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ip", ip)?;
        let body = to_json(&ReverseAssignment {
            ip_reverse: ip.to_string(),
            reverse: reverse.to_string(),
        })?;
        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!("{}/reverse", block_path(ip_block)),
        )
        .with_json(body))
    }

    pub fn set_reverse_properties(
        &self,
        ip_block: &str,
        ip: &str,
        reverse: &str,
    ) -> Result<String, IpError> {
        self.dispatch(self.build_set_reverse_properties(ip_block, ip, reverse)?)
    }

    pub fn build_delete_reverse_properties(
        &self,
        ip_block: &str,
        ip: &str,
    ) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ip", ip)?;
        Ok(HttpRequest::new(HttpMethod::Delete, reverse_path(ip_block, ip)))
    }

    pub fn delete_reverse_properties(&self, ip_block: &str, ip: &str) -> Result<String, IpError> {
        self.dispatch(self.build_delete_reverse_properties(ip_block, ip)?)
    }

    // -----------------------------------------------------------------------
    // Spam
    // -----------------------------------------------------------------------

    /// `spam_state` must be one of `blockedForSpam`, `unblocked` or
    /// `unblocking`, matched exactly.
    pub fn build_get_spam(&self, ip_block: &str, spam_state: &str) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("spamState", spam_state)?;
        let state: SpamState = spam_state
            .parse()
            .map_err(|_| IpError::invalid("spamState", spam_state))?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/spam/?state={state}", block_path(ip_block)),
        ))
    }

    /// IPs of the block currently in the given spam state.
    pub fn get_spam(&self, ip_block: &str, spam_state: &str) -> Result<String, IpError> {
        self.dispatch(self.build_get_spam(ip_block, spam_state)?)
    }

    pub fn build_get_spam_properties(
        &self,
        ip_block: &str,
        ipv4: &str,
    ) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ipv4", ipv4)?;
        Ok(HttpRequest::new(HttpMethod::Get, spam_path(ip_block, ipv4)))
    }

    pub fn get_spam_properties(&self, ip_block: &str, ipv4: &str) -> Result<String, IpError> {
        self.dispatch(self.build_get_spam_properties(ip_block, ipv4)?)
    }

    /// Date bounds are forwarded untouched apart from query encoding.
    pub fn build_get_spam_stats(
        &self,
        ip_block: &str,
        ipv4: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ipv4", ipv4)?;
        require("fromDate", from_date)?;
        require("toDate", to_date)?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!(
                "{}/stats?from={}&to={}",
                spam_path(ip_block, ipv4),
                encode(from_date),
                encode(to_date)
            ),
        ))
    }

    pub fn get_spam_stats(
        &self,
        ip_block: &str,
        ipv4: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<String, IpError> {
        self.dispatch(self.build_get_spam_stats(ip_block, ipv4, from_date, to_date)?)
    }

    pub fn build_set_unblock_spam(&self, ip_block: &str, ipv4: &str) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ipv4", ipv4)?;
        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!("{}/unblock", spam_path(ip_block, ipv4)),
        ))
    }

    /// Ask the provider to lift the spam block on `ipv4`.
    pub fn set_unblock_spam(&self, ip_block: &str, ipv4: &str) -> Result<String, IpError> {
        self.dispatch(self.build_set_unblock_spam(ip_block, ipv4)?)
    }

    // -----------------------------------------------------------------------
    // Relocation
    // -----------------------------------------------------------------------

    /// `ipv4` is required but not part of the request: the whole block moves.
    pub fn build_move_ip_block(
        &self,
        ip_block: &str,
        ipv4: &str,
        destination: &str,
    ) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ipv4", ipv4)?;
        require("destination", destination)?;
        let body = to_json(&BlockMove {
            to: destination.to_string(),
        })?;
        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!("{}/move", block_path(ip_block)),
        )
        .with_json(body))
    }

    pub fn move_ip_block(
        &self,
        ip_block: &str,
        ipv4: &str,
        destination: &str,
    ) -> Result<String, IpError> {
        self.dispatch(self.build_move_ip_block(ip_block, ipv4, destination)?)
    }

    pub fn build_park_ip_block(&self, ip_block: &str, ipv4: &str) -> Result<HttpRequest, IpError> {
        require("ipBlock", ip_block)?;
        require("ipv4", ipv4)?;
        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!("{}/park", block_path(ip_block)),
        ))
    }

    /// Detach the block from its current service.
    pub fn park_ip_block(&self, ip_block: &str, ipv4: &str) -> Result<String, IpError> {
        self.dispatch(self.build_park_ip_block(ip_block, ipv4)?)
    }

    fn dispatch(&self, request: HttpRequest) -> Result<String, IpError> {
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, "dispatching ip request");

        let response = self.http.request(request).map_err(|err| {
            warn!(%method, %path, code = ?err.code(), error = %err, "ip request failed");
            IpError::from(err)
        })?;

        if !response.is_success() {
            warn!(%method, %path, status = response.status, "ip request rejected");
            return Err(IpError::status(response));
        }
        Ok(response.body)
    }
}

fn require(name: &'static str, value: &str) -> Result<(), IpError> {
    if value.is_empty() {
        return Err(IpError::MissingParameter(name));
    }
    Ok(())
}

/// Form-style percent encoding: `/` becomes `%2F`, `:` becomes `%3A`.
fn encode(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

fn block_path(ip_block: &str) -> String {
    format!("{ROOT}{}", encode(ip_block))
}

fn reverse_path(ip_block: &str, ip: &str) -> String {
    format!("{}/reverse/{}", block_path(ip_block), encode(ip))
}

fn spam_path(ip_block: &str, ipv4: &str) -> String {
    format!("{}/spam/{}", block_path(ip_block), encode(ipv4))
}

fn to_json<T: serde::Serialize>(payload: &T) -> Result<String, IpError> {
    serde_json::to_string(payload).map_err(IpError::encoding)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::{HttpResponse, TransportError, JSON_CONTENT_TYPE};

    /// Records every request and answers with a canned result.
    struct MockHttp {
        calls: Mutex<Vec<HttpRequest>>,
        reply: fn() -> Result<HttpResponse, TransportError>,
    }

    impl MockHttp {
        fn answering(reply: fn() -> Result<HttpResponse, TransportError>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply,
            }
        }

        fn calls(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl HttpClient for MockHttp {
        fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(request);
            (self.reply)()
        }
    }

    const BODY: &str = r#"{"ipBlock":"1.2.3.0/24","description":"prod"}"#;

    fn client() -> IpBlockClient<MockHttp> {
        IpBlockClient::new(MockHttp::answering(|| Ok(HttpResponse::ok(BODY))))
    }

    fn failing_client() -> IpBlockClient<MockHttp> {
        IpBlockClient::new(MockHttp::answering(|| {
            Err(TransportError::new("connection refused").with_code(7))
        }))
    }

    fn body_json(req: &HttpRequest) -> serde_json::Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    /// Every operation invoked with valid arguments.
    fn call_all(c: &IpBlockClient<MockHttp>) -> Vec<Result<String, IpError>> {
        let b = "1.2.3.0/24";
        let ip = "1.2.3.4";
        vec![
            c.get_block_properties(b),
            c.set_block_properties(b, "prod"),
            c.get_block_arp(b),
            c.get_blocked_info(b, ip),
            c.get_reverse(b),
            c.get_reverse_properties(b, ip),
            c.set_reverse_properties(b, ip, "host.example.com."),
            c.delete_reverse_properties(b, ip),
            c.get_spam(b, "blockedForSpam"),
            c.get_spam_properties(b, ip),
            c.get_spam_stats(b, ip, "2024-01-01", "2024-02-01"),
            c.set_unblock_spam(b, ip),
            c.move_ip_block(b, ip, "dest-service"),
            c.park_ip_block(b, ip),
        ]
    }

    #[test]
    fn set_block_properties_encodes_ipv6_block() {
        let c = client();
        c.set_block_properties("2001:41d0::/48", "prod").unwrap();
        let calls = c.http().calls();
        assert_eq!(calls.len(), 1);
        let req = &calls[0];
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "ip/2001%3A41d0%3A%3A%2F48");
        assert_eq!(
            req.headers,
            vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())]
        );
        assert_eq!(req.body.as_deref(), Some(r#"{"description":"prod"}"#));
    }

    #[test]
    fn set_reverse_properties_posts_assignment() {
        let req = client()
            .build_set_reverse_properties("1.2.3.0/24", "1.2.3.4", "host.example.com.")
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "ip/1.2.3.0%2F24/reverse");
        assert_eq!(
            req.body.as_deref(),
            Some(r#"{"ipReverse":"1.2.3.4","reverse":"host.example.com."}"#)
        );
    }

    #[test]
    fn set_reverse_properties_accepts_empty_reverse() {
        let c = client();
        c.set_reverse_properties("1.2.3.0/24", "1.2.3.4", "").unwrap();
        let calls = c.http().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(body_json(&calls[0])["reverse"], "");
    }

    #[test]
    fn move_ip_block_posts_destination() {
        let req = client()
            .build_move_ip_block("1.2.3.0/24", "1.2.3.4", "dest-service")
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "ip/1.2.3.0%2F24/move");
        assert_eq!(req.body.as_deref(), Some(r#"{"to":"dest-service"}"#));
        assert_eq!(req.header("Content-Type"), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn read_operations_have_expected_paths() {
        let c = client();
        let b = "1.2.3.0/24";
        let cases = [
            (c.build_get_block_properties(b), "ip/1.2.3.0%2F24"),
            (c.build_get_block_arp(b), "ip/1.2.3.0%2F24/arp"),
            (c.build_get_blocked_info(b, "1.2.3.4"), "ip/1.2.3.0%2F24/arp/1.2.3.4"),
            (c.build_get_reverse(b), "ip/1.2.3.0%2F24/reverse/"),
            (c.build_get_reverse_properties(b, "1.2.3.4"), "ip/1.2.3.0%2F24/reverse/1.2.3.4"),
            (c.build_get_spam_properties(b, "1.2.3.4"), "ip/1.2.3.0%2F24/spam/1.2.3.4"),
        ];
        for (req, path) in cases {
            let req = req.unwrap();
            assert_eq!(req.method, HttpMethod::Get, "{path}");
            assert_eq!(req.path, path);
            assert!(req.body.is_none(), "{path}");
            assert!(req.headers.is_empty(), "{path}");
        }
    }

    #[test]
    fn delete_reverse_properties_uses_delete() {
        let req = client()
            .build_delete_reverse_properties("1.2.3.0/24", "1.2.3.4")
            .unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "ip/1.2.3.0%2F24/reverse/1.2.3.4");
        assert!(req.body.is_none());
    }

    #[test]
    fn ipv6_address_segment_is_encoded() {
        let req = client()
            .build_get_reverse_properties("2001:41d0::/48", "2001:41d0::1")
            .unwrap();
        assert_eq!(req.path, "ip/2001%3A41d0%3A%3A%2F48/reverse/2001%3A41d0%3A%3A1");
    }

    #[test]
    fn post_actions_without_payload() {
        let c = client();
        let unblock = c.build_set_unblock_spam("1.2.3.0/24", "1.2.3.4").unwrap();
        assert_eq!(unblock.method, HttpMethod::Post);
        assert_eq!(unblock.path, "ip/1.2.3.0%2F24/spam/1.2.3.4/unblock");
        assert!(unblock.body.is_none());

        let park = c.build_park_ip_block("1.2.3.0/24", "1.2.3.4").unwrap();
        assert_eq!(park.method, HttpMethod::Post);
        assert_eq!(park.path, "ip/1.2.3.0%2F24/park");
        assert!(park.body.is_none());
    }

    #[test]
    fn get_spam_accepts_each_state() {
        for state in SpamState::ALL {
            let c = client();
            let body = c.get_spam("1.2.3.0/24", state.as_str()).unwrap();
            assert_eq!(body, BODY);
            let calls = c.http().calls();
            assert_eq!(calls[0].method, HttpMethod::Get);
            assert_eq!(
                calls[0].path,
                format!("ip/1.2.3.0%2F24/spam/?state={}", state.as_str())
            );
        }
    }

    #[test]
    fn get_spam_rejects_unknown_state_without_calling() {
        let c = client();
        let err = c.get_spam("1.2.3.0/24", "spamming").unwrap_err();
        assert!(matches!(
            err,
            IpError::InvalidParameter { name: "spamState", ref value } if value == "spamming"
        ));
        let err = c.get_spam("1.2.3.0/24", "Unblocked").unwrap_err();
        assert!(matches!(err, IpError::InvalidParameter { .. }));
        assert!(c.http().calls().is_empty());
    }

    #[test]
    fn get_spam_reports_missing_before_invalid() {
        let c = client();
        let err = c.get_spam("1.2.3.0/24", "").unwrap_err();
        assert!(matches!(err, IpError::MissingParameter("spamState")));
    }

    #[test]
    fn get_spam_stats_encodes_date_bounds() {
        let req = client()
            .build_get_spam_stats("1.2.3.0/24", "1.2.3.4", "2024-01-01T00:00:00+01:00", "2024-02-01")
            .unwrap();
        assert_eq!(
            req.path,
            "ip/1.2.3.0%2F24/spam/1.2.3.4/stats?from=2024-01-01T00%3A00%3A00%2B01%3A00&to=2024-02-01"
        );
    }

    #[test]
    fn missing_parameters_are_named_and_never_dispatched() {
        let c = client();
        let b = "1.2.3.0/24";
        let ip = "1.2.3.4";
        let cases: Vec<(Result<String, IpError>, &str)> = vec![
            (c.get_block_properties(""), "ipBlock"),
            (c.set_block_properties("", "prod"), "ipBlock"),
            (c.set_block_properties(b, ""), "description"),
            (c.get_block_arp(""), "ipBlock"),
            (c.get_blocked_info("", ip), "ipBlock"),
            (c.get_blocked_info(b, ""), "ip"),
            (c.get_reverse(""), "ipBlock"),
            (c.get_reverse_properties("", ip), "ipBlock"),
            (c.get_reverse_properties(b, ""), "ip"),
            (c.set_reverse_properties("", ip, "r."), "ipBlock"),
            (c.set_reverse_properties(b, "", "r."), "ip"),
            (c.delete_reverse_properties("", ip), "ipBlock"),
            (c.delete_reverse_properties(b, ""), "ip"),
            (c.get_spam("", "unblocked"), "ipBlock"),
            (c.get_spam_properties("", ip), "ipBlock"),
            (c.get_spam_properties(b, ""), "ipv4"),
            (c.get_spam_stats("", ip, "a", "b"), "ipBlock"),
            (c.get_spam_stats(b, "", "a", "b"), "ipv4"),
            (c.get_spam_stats(b, ip, "", "b"), "fromDate"),
            (c.get_spam_stats(b, ip, "a", ""), "toDate"),
            (c.set_unblock_spam("", ip), "ipBlock"),
            (c.set_unblock_spam(b, ""), "ipv4"),
            (c.move_ip_block("", ip, "d"), "ipBlock"),
            (c.move_ip_block(b, "", "d"), "ipv4"),
            (c.move_ip_block(b, ip, ""), "destination"),
            (c.park_ip_block("", ip), "ipBlock"),
            (c.park_ip_block(b, ""), "ipv4"),
        ];
        for (result, expected) in cases {
            match result {
                Err(IpError::MissingParameter(name)) => assert_eq!(name, expected),
                other => panic!("expected missing {expected}, got {other:?}"),
            }
        }
        assert!(c.http().calls().is_empty());
    }

    #[test]
    fn responses_are_returned_verbatim() {
        let c = client();
        for result in call_all(&c) {
            assert_eq!(result.unwrap(), BODY);
        }
        assert_eq!(c.http().calls().len(), 14);
    }

    #[test]
    fn transport_failures_become_operation_errors() {
        let c = failing_client();
        for result in call_all(&c) {
            match result {
                Err(err @ IpError::Operation { .. }) => {
                    assert_eq!(err.code(), Some(7));
                    assert!(err.to_string().contains("connection refused"));
                    assert!(std::error::Error::source(&err).is_some());
                }
                other => panic!("expected operation error, got {other:?}"),
            }
        }
        // one attempt per operation, no retries
        assert_eq!(c.http().calls().len(), 14);
    }

    #[test]
    fn failing_status_becomes_operation_error() {
        let c = IpBlockClient::new(MockHttp::answering(|| {
            Ok(HttpResponse {
                status: 404,
                headers: Vec::new(),
                body: r#"{"message":"The requested object (ipBlock = 9.9.9.0/24) does not exist"}"#
                    .to_string(),
            })
        }));
        let err = c.get_block_properties("9.9.9.0/24").unwrap_err();
        assert_eq!(err.code(), Some(404));
        assert!(err.to_string().contains("does not exist"));
        assert_eq!(c.http().calls().len(), 1);
    }

    #[test]
    fn empty_success_body_is_returned() {
        let c = IpBlockClient::new(MockHttp::answering(|| Ok(HttpResponse::ok("null"))));
        assert_eq!(c.set_block_properties("1.2.3.0/24", "prod").unwrap(), "null");
    }
}
