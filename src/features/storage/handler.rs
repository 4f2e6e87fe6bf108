use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::error::AppError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/user_content/{filename}",
    summary = "读取图片文件",
    description = "返回生成结果图或上传的参考图。需要已登录会话。",
    params(("filename" = String, Path, description = "Blob 文件名")),
    responses(
        (status = 200, description = "图片内容", body = Vec<u8>, content_type = "image/png"),
        (status = 401, description = "未登录", body = crate::error::ProblemDetails),
        (status = 404, description = "文件不存在", body = crate::error::ProblemDetails)
    ),
    tag = "Storage"
)]
pub async fn serve_blob(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    state.sessions.authorize(&headers).await?;

    let bytes = state.blobs.get(&filename).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type_of(&filename)),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    )
        .into_response())
}

/// 按扩展名推断 Content-Type，未知扩展按二进制流返回。
fn content_type_of(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(str::to_ascii_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "bmp" => "image/bmp",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "tiff" => "image/tiff",
        Some(ext) if ext == "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// 图片文件路由（挂在根路径下，不带 API 前缀）。
pub fn create_storage_router() -> Router<AppState> {
    Router::new().route("/user_content/:filename", get(serve_blob))
}
