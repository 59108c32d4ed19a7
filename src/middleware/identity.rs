use std::fmt;
use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, Request},
};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// 调用方标识（IP 地址），未经认证，可通过 X-Forwarded-For 伪造
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 优先取 X-Forwarded-For 的第一个地址，否则使用连接地址
pub fn resolve_client_key<B>(req: &Request<B>) -> Option<ClientKey> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_key_from_parts(req.headers(), peer)
}

pub fn client_key_from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<ClientKey> {
    if let Some(forwarded) = headers.get(X_FORWARDED_FOR) {
        // 头存在但无法解析时直接视为无法识别，不回退到连接地址
        let first = forwarded.to_str().ok()?.split(',').next()?.trim();
        if !first.is_empty() {
            return Some(ClientKey::new(first));
        }
        if !forwarded.as_bytes().is_empty() {
            return None;
        }
    }
    peer.map(|addr| ClientKey::new(addr.ip().to_string()))
}
