use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::features::moderation::middleware::ClientIp;
use crate::state::AppState;

use super::models::{GalleryItemView, GalleryPage, LikeResponse, SortKey};

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    /// 页码（1 开始）
    pub page: Option<u32>,
    /// 每页条数
    pub per_page: Option<u32>,
    /// 排序方式：newest / oldest / likes
    pub sort: Option<String>,
}

#[utoipa::path(
    get,
    path = "/gallery",
    summary = "画廊分页列表",
    description = "按创建时间或点赞数排序的画廊分页数据，附带当前调用方的点赞状态，用于无限滚动。",
    params(
        ("page" = Option<u32>, Query, description = "页码，默认 1"),
        ("per_page" = Option<u32>, Query, description = "每页条数，默认 15"),
        ("sort" = Option<String>, Query, description = "排序：newest（默认）/ oldest / likes")
    ),
    responses(
        (status = 200, description = "分页数据", body = GalleryPage),
        (status = 401, description = "未登录", body = crate::error::ProblemDetails)
    ),
    tag = "Gallery"
)]
pub async fn list_gallery(
    State(state): State<AppState>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    headers: HeaderMap,
    Query(q): Query<GalleryQuery>,
) -> Result<Json<GalleryPage>, AppError> {
    state.sessions.authorize(&headers).await?;

    let cfg = &state.config.gallery;
    let page = q.page.unwrap_or(1).max(1);
    let per_page = q
        .per_page
        .unwrap_or(cfg.default_per_page)
        .clamp(1, cfg.max_per_page);
    let sort = SortKey::parse(q.sort.as_deref());

    Ok(Json(state.gallery.list(page, per_page, sort, &client_ip)))
}

#[utoipa::path(
    get,
    path = "/gallery/{id}",
    summary = "画廊单条详情",
    params(("id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, description = "图片详情", body = GalleryItemView),
        (status = 404, description = "图片不存在", body = crate::error::ProblemDetails)
    ),
    tag = "Gallery"
)]
pub async fn get_image(
    State(state): State<AppState>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<GalleryItemView>, AppError> {
    state.sessions.authorize(&headers).await?;
    Ok(Json(state.gallery.get(&id, &client_ip)?))
}

#[utoipa::path(
    post,
    path = "/gallery/{id}/like",
    summary = "点赞",
    description = "按调用方 IP 去重：同一 IP 对同一图片重复点赞返回 ALREADY_LIKED，不改变计数。",
    params(("id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, description = "点赞成功", body = LikeResponse),
        (status = 400, description = "重复点赞", body = crate::error::ProblemDetails),
        (status = 404, description = "图片不存在", body = crate::error::ProblemDetails)
    ),
    tag = "Gallery"
)]
pub async fn like_image(
    State(state): State<AppState>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<LikeResponse>, AppError> {
    state.sessions.authorize(&headers).await?;

    let likes = state.gallery.like(&id, &client_ip)?;
    tracing::info!(image_id = %id, ip = %client_ip, likes, "点赞成功");

    Ok(Json(LikeResponse {
        success: true,
        likes,
        user_liked: true,
    }))
}

/// 画廊路由
pub fn create_gallery_router() -> Router<AppState> {
    Router::new()
        .route("/gallery", get(list_gallery))
        .route("/gallery/:id", get(get_image))
        .route("/gallery/:id/like", post(like_image))
}
