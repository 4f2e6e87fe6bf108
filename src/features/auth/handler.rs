use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Json, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

use super::session::SESSION_COOKIE;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginForm {
    /// 站点口令或管理口令
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[schema(example = json!({"success": true, "is_admin": false}))]
pub struct LoginResponse {
    pub success: bool,
    pub is_admin: bool,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    summary = "登录",
    description = "表单提交口令，成功后通过 Set-Cookie 下发会话。管理口令获得管理会话。",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "登录成功", body = LoginResponse),
        (status = 401, description = "口令错误", body = crate::error::ProblemDetails)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let (sid, data) = state.sessions.login(&form.password).await?;
    tracing::info!(is_admin = data.admin, "登录成功");

    let cookie = format!(
        "{SESSION_COOKIE}={sid}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        state.sessions.ttl_secs()
    );
    let mut response = Json(LoginResponse {
        success: true,
        is_admin: data.admin,
    })
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("构造会话 Cookie 失败: {e}")))?,
    );
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    summary = "注销",
    description = "失效当前会话并清除 Cookie。幂等，未登录调用也返回成功。",
    responses((status = 200, description = "已注销")),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.sessions.logout(&headers).await;

    let mut response = Json(serde_json::json!({"success": true})).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("sid=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"),
    );
    response
}

/// 认证路由
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}
