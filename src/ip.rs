//! Client address used to key per-IP rate limits.

use actix_web::HttpRequest;
use std::net::IpAddr;

/// First syntactically valid address among `X-Forwarded-For` (first hop),
/// `X-Real-IP`, then the socket peer.
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    let forwarded = header("x-forwarded-for")
        .and_then(|list| list.split(',').next().map(|hop| hop.trim().to_owned()));
    let real = header("x-real-ip").map(|v| v.trim().to_owned());

    forwarded
        .into_iter()
        .chain(real)
        .find(|candidate| candidate.parse::<IpAddr>().is_ok())
        .or_else(|| req.peer_addr().map(|peer| peer.ip().to_string()))
}

/// Requests with no address share one bucket.
pub fn client_key(req: &HttpRequest) -> String {
    extract_client_ip(req).unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_forwarded_for_first_hop() {
        let req = TestRequest::default()
            .insert_header(("x-forwarded-for", "203.0.113.7, 10.0.0.1"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_garbage_header_is_skipped() {
        let req = TestRequest::default()
            .insert_header(("x-forwarded-for", "not-an-ip"))
            .insert_header(("x-real-ip", "198.51.100.2"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_peer_address() {
        let req = TestRequest::default()
            .peer_addr("192.0.2.10:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(client_key(&req), "192.0.2.10");
    }

    #[test]
    fn test_no_address() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(client_key(&req), "unknown");
    }
}
