use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

/// 请求追踪头。
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 请求扩展中的追踪 ID。
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

tokio::task_local! {
    /// 当前请求的追踪 ID。ProblemDetails 在构造错误响应时读取，
    /// 使排障时能把客户端看到的错误与服务端日志对上。
    static ACTIVE_REQUEST_ID: String;
}

/// 当前请求的追踪 ID（错误响应构造路径使用）。
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// 客户端自带的追踪 ID 只在长度与字符集都可控时采信，
/// 否则视为缺失并由服务端补发。
fn sanitize_client_id(raw: &str) -> Option<&str> {
    let id = raw.trim();
    let acceptable = (1..=64).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    acceptable.then_some(id)
}

/// 服务端补发的追踪 ID：32 位小写十六进制。
fn issue_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 追踪 ID 中间件。
///
/// 采信或补发追踪 ID，注入请求扩展与任务上下文（错误响应由此取值），
/// 响应返回前回写到响应头。
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(sanitize_client_id)
        .map(str::to_string)
        .unwrap_or_else(issue_request_id);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = ACTIVE_REQUEST_ID.scope(id.clone(), next.run(req)).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}
