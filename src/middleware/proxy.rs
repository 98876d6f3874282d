//! Client address adoption from reverse-proxy headers.
//!
//! Headers are only trusted when the stage is enabled; otherwise the peer
//! address of the TCP connection is used.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, OptionalFromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::MethodRouter;

/// Address of the client that issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub IpAddr);

/// Identity when `enabled` is false.
pub fn proxy_headers<S>(enabled: bool) -> fn(MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    if enabled {
        trust_proxy_headers::<S> as fn(MethodRouter<S>) -> MethodRouter<S>
    } else {
        std::convert::identity
    }
}

fn trust_proxy_headers<S>(route: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.layer(middleware::from_fn(adopt_proxy_headers))
}

async fn adopt_proxy_headers(mut req: Request, next: Next) -> Response {
    if let Some(addr) = forwarded_client(req.headers()) {
        req.extensions_mut().insert(ClientAddr(addr));
    }
    next.run(req).await
}

/// `X-Forwarded-For` (first hop), then `X-Real-IP`, then `Forwarded: for=`.
pub fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(xff) = header("x-forwarded-for")
        && let Some(ip) = xff.split(',').next().and_then(parse_addr)
    {
        return Some(ip);
    }

    if let Some(ip) = header("x-real-ip").and_then(parse_addr) {
        return Some(ip);
    }

    header("forwarded")?
        .split([',', ';'])
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.eq_ignore_ascii_case("for"))
        .and_then(|(_, value)| parse_addr(value))
}

fn parse_addr(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim().trim_matches('"');
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(sock) = raw.parse::<SocketAddr>() {
        return Some(sock.ip());
    }
    // `[v6]` without a port
    raw.strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .and_then(|r| r.parse().ok())
}

impl<S> OptionalFromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        if let Some(addr) = parts.extensions.get::<ClientAddr>() {
            return Ok(Some(*addr));
        }
        Ok(parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(peer)| ClientAddr(peer.ip())))
    }
}
