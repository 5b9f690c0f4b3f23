//! Per-request metadata: correlation id and client address

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};
use std::convert::Infallible;
use std::net::SocketAddr;
use uuid::Uuid;

/// Correlation id placed in request extensions by the request id middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Request context carried into audit records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    /// First `x-forwarded-for` hop, else the socket peer
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            client_ip: None,
            user_agent: None,
        }
    }
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .or_else(|| header_value(&parts.headers, "x-request-id"))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            request_id,
            client_ip: forwarded_for(&parts.headers).or(peer),
            user_agent: header_value(&parts.headers, header::USER_AGENT.as_str()),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(ToString::to_string)
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(ToString::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_forwarded_for_first_hop_wins() {
        let mut parts = parts(
            Request::builder()
                .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
                .body(())
                .unwrap(),
        );
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let ctx = RequestContext::from_parts(&parts);
        assert_eq!(ctx.client_ip.as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut parts = parts(Request::builder().body(()).unwrap());
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));

        assert_eq!(RequestContext::from_parts(&parts).client_ip.as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn test_request_id_from_extension() {
        let mut parts = parts(Request::builder().header("x-request-id", "header-id").body(()).unwrap());
        parts.extensions.insert(RequestId("middleware-id".to_string()));
        assert_eq!(RequestContext::from_parts(&parts).request_id, "middleware-id");

        let parts = self::parts(Request::builder().header("x-request-id", "header-id").body(()).unwrap());
        assert_eq!(RequestContext::from_parts(&parts).request_id, "header-id");
    }
}
