use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// 请求扩展中的调用方 IP（由封禁中间件解析并注入）。
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// 封禁检查中间件。
///
/// 对所有入站请求（探活 `/health` 除外）先行检查来源 IP 是否被封禁，
/// 并把解析出的 IP 注入请求扩展供下游 handler 使用。
pub async fn ban_guard_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ip = resolve_client_ip(&req);

    if req.uri().path() != "/health" && state.moderation.is_banned(&ip) {
        tracing::warn!(ip = %ip, path = %req.uri().path(), "封禁 IP 的请求被拒绝");
        return AppError::Banned.into_response();
    }

    req.extensions_mut().insert(ClientIp(ip));
    next.run(req).await
}

/// 解析调用方 IP：优先代理头，其次 TCP 对端地址。
fn resolve_client_ip(req: &Request) -> String {
    if let Some(ip) = client_ip_from_headers(req.headers()) {
        return ip.to_string();
    }
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

/// 从代理头提取调用方 IP（优先 X-Forwarded-For 首项，其次 X-Real-IP）。
fn client_ip_from_headers(headers: &axum::http::HeaderMap) -> Option<&str> {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next().map(|s| s.trim()))
        && !ip.is_empty()
    {
        return Some(ip);
    }
    if let Some(v) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let s = v.trim();
        if !s.is_empty() {
            return Some(s);
        }
    }
    None
}
