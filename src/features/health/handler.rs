use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;

use crate::features::gallery::models::now_kst;
use crate::state::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[schema(example = json!({
  "status": "ok",
  "server_time_kst": "2025-09-20T13:10:44+09:00",
  "total_images": 42,
  "total_likes": 128
}))]
pub struct HealthResponse {
    pub status: &'static str,
    pub server_time_kst: String,
    pub total_images: usize,
    pub total_likes: u64,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "探活端点，不要求登录、不受封禁拦截。",
    responses((status = 200, description = "服务正常", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        server_time_kst: now_kst().to_rfc3339(),
        total_images: state.gallery.total_images(),
        total_likes: state.gallery.total_likes(),
    })
}

/// 探活路由（挂在根路径下，不带 API 前缀）。
pub fn create_health_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
