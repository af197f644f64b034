// ============================
// crates/backend-lib/src/middleware/client_ip.rs
// ============================
//! Peer address of the connection a request arrived on.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

/// Client IP taken from `ConnectInfo<SocketAddr>`.
///
/// Falls back to `0.0.0.0` when the server was not started with connect
/// info (e.g. a router driven directly in tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl ClientIp {
    pub const UNKNOWN: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
}

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map_or(Self::UNKNOWN, |ConnectInfo(addr)| addr.ip());
        Ok(ClientIp(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_reads_connect_info() {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        let addr: SocketAddr = "203.0.113.5:40000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        let (mut parts, _) = request.into_parts();

        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, addr.ip());
    }

    #[tokio::test]
    async fn test_missing_connect_info_is_unknown() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, ClientIp::UNKNOWN);
    }
}
