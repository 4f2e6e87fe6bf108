use std::collections::HashSet;

use axum::{
    Extension, Router,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::features::storage::blob::blob_name_from_path;
use crate::state::AppState;

use super::middleware::ClientIp;

/// 管理端批量删除请求
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[schema(example = json!({"image_ids": ["7b6c9d3e"], "ban_users": true}))]
pub struct DeleteImagesRequest {
    /// 要删除的图片 ID 列表
    pub image_ids: Vec<String>,
    /// 是否同时封禁这些图片的创建者 IP
    #[serde(default)]
    pub ban_users: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[schema(example = json!({"success": true, "deleted_count": 2, "banned_ips_count": 1}))]
pub struct DeleteImagesResponse {
    pub success: bool,
    pub deleted_count: usize,
    pub banned_ips_count: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[schema(example = json!({"is_admin": true, "banned_ips_count": 3, "total_images": 42}))]
pub struct AdminStatusResponse {
    pub is_admin: bool,
    pub banned_ips_count: usize,
    pub total_images: usize,
}

#[utoipa::path(
    post,
    path = "/admin/images/delete",
    summary = "管理端批量删除图片",
    description = "删除画廊记录并清理对应 Blob（清理失败仅记日志）；ban_users=true 时同时封禁创建者 IP。",
    request_body = DeleteImagesRequest,
    responses(
        (status = 200, description = "删除完成", body = DeleteImagesResponse),
        (status = 403, description = "非管理员", body = crate::error::ProblemDetails)
    ),
    tag = "Admin"
)]
pub async fn delete_images(
    State(state): State<AppState>,
    Extension(ClientIp(admin_ip)): Extension<ClientIp>,
    headers: HeaderMap,
    Json(req): Json<DeleteImagesRequest>,
) -> Result<Json<DeleteImagesResponse>, AppError> {
    let session = state.sessions.authorize(&headers).await?;
    if !session.admin {
        return Err(AppError::Forbidden("需要管理员权限".to_string()));
    }
    if req.image_ids.is_empty() {
        return Err(AppError::Validation("请选择要删除的图片".to_string()));
    }

    let ids: HashSet<String> = req.image_ids.into_iter().collect();
    let removed = state.gallery.remove_by_ids(&ids);

    // Blob 清理尽力而为：删除失败不回滚、不阻断批次
    let mut creator_ips: HashSet<String> = HashSet::new();
    for record in &removed {
        if let Some(name) = blob_name_from_path(&record.result_image) {
            state.blobs.delete(name).await;
        }
        for img in &record.uploaded_images {
            if let Some(name) = blob_name_from_path(&img.path) {
                state.blobs.delete(name).await;
            }
        }

        // 记录缺失内联 IP 时回查创建者映射
        if !record.creator_ip.is_empty() {
            creator_ips.insert(record.creator_ip.clone());
        } else if let Some(ip) = state.moderation.creator_of(&record.id) {
            creator_ips.insert(ip);
        }
    }

    let banned_ips_count = if req.ban_users && !creator_ips.is_empty() {
        tracing::warn!(ips = ?creator_ips, "封禁创建者 IP");
        state.moderation.ban_all(creator_ips)
    } else {
        0
    };

    tracing::info!(
        deleted = removed.len(),
        banned = banned_ips_count,
        admin_ip = %admin_ip,
        "管理端删除完成"
    );

    Ok(Json(DeleteImagesResponse {
        success: true,
        deleted_count: removed.len(),
        banned_ips_count,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/status",
    summary = "管理端状态",
    description = "返回当前会话是否为管理员、封禁 IP 数与图片总数。任何已登录会话可调用。",
    responses(
        (status = 200, description = "状态", body = AdminStatusResponse),
        (status = 401, description = "未登录", body = crate::error::ProblemDetails)
    ),
    tag = "Admin"
)]
pub async fn admin_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminStatusResponse>, AppError> {
    let session = state.sessions.authorize(&headers).await?;

    Ok(Json(AdminStatusResponse {
        is_admin: session.admin,
        banned_ips_count: state.moderation.banned_count(),
        total_images: state.gallery.total_images(),
    }))
}

/// 管理端路由
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/images/delete", post(delete_images))
        .route("/admin/status", get(admin_status))
}
