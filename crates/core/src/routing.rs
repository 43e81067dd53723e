//! Direct/proxy routing policy
//!
//! A pure function over the direct flag, the request verb and the failure
//! (if any) of the previous direct attempt. The client consults it once
//! before the first attempt and once more after a direct failure.

use stockbridge_domain::{BridgeError, HttpMethod, TransportKind};

/// Outcome of a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Send (or resend) through this transport.
    Use(TransportKind),
    /// Give the failure back to the caller.
    Surface,
}

/// Decides where a catalog request goes.
///
/// * `direct_enabled`: the process-wide direct flag.
/// * `direct_ready`: whether a direct transport has been built.
/// * `prior_direct_failure`: the error of the direct attempt, when deciding
///   on a failover.
///
/// After a direct failure, only transient failures (rate limiting, server
/// errors, network errors) move an idempotent request to the proxy. A 404
/// means the endpoint is genuinely absent, authentication and validation
/// errors surface immediately, and a POST is never replayed.
#[must_use]
pub fn route(
    direct_enabled: bool,
    direct_ready: bool,
    method: HttpMethod,
    prior_direct_failure: Option<&BridgeError>,
) -> RouteDecision {
    match prior_direct_failure {
        None if direct_enabled && direct_ready => RouteDecision::Use(TransportKind::Direct),
        None => RouteDecision::Use(TransportKind::Proxy),
        Some(error) if method.is_idempotent() && error.is_retryable() => {
            RouteDecision::Use(TransportKind::Proxy)
        }
        Some(_) => RouteDecision::Surface,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_direct_only_when_enabled_and_ready() {
        let direct = RouteDecision::Use(TransportKind::Direct);
        let proxy = RouteDecision::Use(TransportKind::Proxy);
        assert_eq!(route(true, true, HttpMethod::Get, None), direct);
        assert_eq!(route(true, false, HttpMethod::Get, None), proxy);
        assert_eq!(route(false, true, HttpMethod::Post, None), proxy);
    }

    #[test]
    fn not_found_never_fails_over() {
        let err = BridgeError::NotFound("foo".into());
        assert_eq!(route(true, true, HttpMethod::Get, Some(&err)), RouteDecision::Surface);
    }

    #[test]
    fn transient_failures_fail_over_for_idempotent_verbs() {
        let network = BridgeError::Network("connection refused".into());
        for method in [HttpMethod::Get, HttpMethod::Head, HttpMethod::Put, HttpMethod::Delete] {
            assert_eq!(
                route(true, true, method, Some(&network)),
                RouteDecision::Use(TransportKind::Proxy),
                "{method} should fail over"
            );
        }
        assert_eq!(route(true, true, HttpMethod::Post, Some(&network)), RouteDecision::Surface);
    }

    #[test]
    fn terminal_failures_surface() {
        for err in [
            BridgeError::Auth("401".into()),
            BridgeError::Validation("bad".into()),
            BridgeError::Cancelled,
            BridgeError::Timeout(30_000),
        ] {
            let decision = route(true, true, HttpMethod::Get, Some(&err));
            assert_eq!(decision, RouteDecision::Surface, "{err}");
        }
    }
}
