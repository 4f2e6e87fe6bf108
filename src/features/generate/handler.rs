use axum::{
    Extension, Router,
    extract::{Multipart, State},
    http::HeaderMap,
    response::Json,
    routing::post,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::features::gallery::models::{GalleryRecord, UploadedImage, now_kst};
use crate::features::moderation::middleware::ClientIp;
use crate::features::storage::blob::{BlobKind, new_blob_id};
use crate::state::AppState;

use super::client::ReferenceImage;
use super::models::GenerateResponse;
use super::validate::validate_image_file;

/// 多部分表单解析出来的生成请求。
struct GenerateForm {
    prompt: String,
    aspect_ratio: String,
    images: Vec<IncomingImage>,
}

struct IncomingImage {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/generate",
    summary = "生成图片",
    description = "multipart 表单提交 prompt、可选 aspect_ratio 与至多两张参考图（image1 / image2）。\
生成结果与输入记录一并进入画廊。",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "生成成功", body = GenerateResponse),
        (status = 422, description = "参数校验失败", body = crate::error::ProblemDetails),
        (status = 502, description = "上游不可用", body = crate::error::ProblemDetails),
        (status = 504, description = "上游超时", body = crate::error::ProblemDetails)
    ),
    tag = "Generate"
)]
pub async fn generate_image(
    State(state): State<AppState>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    state.sessions.authorize(&headers).await?;

    let form = read_form(multipart).await?;
    let prompt = form.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::Validation("提示词不能为空".to_string()));
    }

    // 上传的参考图先校验、先落盘，再发起上游调用
    let mut uploaded = Vec::with_capacity(form.images.len());
    let mut references = Vec::with_capacity(form.images.len());
    for img in form.images {
        validate_image_file(&img.filename, img.content_type.as_deref(), img.bytes.len())?;

        let blob_name = upload_blob_name(&img.filename);
        state
            .blobs
            .put(BlobKind::Upload, &blob_name, &img.bytes)
            .await?;
        uploaded.push(UploadedImage {
            filename: img.filename,
            path: format!("/user_content/{blob_name}"),
        });
        references.push(ReferenceImage {
            mime_type: img
                .content_type
                .unwrap_or_else(|| "image/png".to_string()),
            bytes: img.bytes,
        });
    }

    tracing::info!(
        prompt_len = prompt.len(),
        reference_count = references.len(),
        aspect_ratio = %form.aspect_ratio,
        ip = %client_ip,
        "发起图片生成"
    );

    let output = state
        .generator
        .generate(&prompt, &references, &form.aspect_ratio)
        .await?;

    let result_name = new_blob_id();
    state
        .blobs
        .put(BlobKind::Result, &result_name, &output.image_bytes)
        .await?;

    let id = result_name
        .strip_suffix(".png")
        .unwrap_or(&result_name)
        .to_string();
    let result_image = format!("/user_content/{result_name}");

    state.gallery.append(GalleryRecord {
        id: id.clone(),
        result_image: result_image.clone(),
        prompt,
        uploaded_images: uploaded,
        response_text: output.text.clone(),
        created_at: now_kst(),
        likes: 0,
        creator_ip: client_ip.clone(),
    });
    state.moderation.record_creator(&id, &client_ip);

    tracing::info!(image_id = %id, "生成成功并入库");

    Ok(Json(GenerateResponse {
        success: true,
        result_image,
        response_text: output.text,
    }))
}

/// 解析 multipart 表单。未知字段忽略；image1 / image2 之外的文件字段不接收。
async fn read_form(mut multipart: Multipart) -> Result<GenerateForm, AppError> {
    let mut form = GenerateForm {
        prompt: String::new(),
        aspect_ratio: String::new(),
        images: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("解析表单失败: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "prompt" => {
                form.prompt = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("读取 prompt 失败: {e}")))?;
            }
            "aspect_ratio" => {
                form.aspect_ratio = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("读取 aspect_ratio 失败: {e}")))?;
            }
            "image1" | "image2" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                // 浏览器对未选择的文件输入会提交空文件名的空字段
                if filename.is_empty() {
                    continue;
                }
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("读取 {name} 失败: {e}")))?;
                form.images.push(IncomingImage {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// 上传参考图的存储名：UUID + 原始扩展名（小写）。
fn upload_blob_name(original: &str) -> String {
    let ext = original
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    format!("{}.{ext}", Uuid::new_v4())
}

/// 生成路由
pub fn create_generate_router() -> Router<AppState> {
    Router::new().route("/generate", post(generate_image))
}
