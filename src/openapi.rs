use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 为 Swagger UI 提供正确的“业务接口前缀”Servers 配置。
///
/// - 业务接口默认前缀为 `/api/v1`（对应 `config.api.prefix` / `APP_API_PREFIX`）。
/// - `/health` 与 `/user_content/*` 不带前缀，额外提供 `/` 作为备用 server。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api/v1）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api/v1")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP_API_PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（/health 与 /user_content 等不带前缀接口）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health,
        crate::features::storage::handler::serve_blob,
        crate::features::auth::handler::login,
        crate::features::auth::handler::logout,
        crate::features::generate::handler::generate_image,
        crate::features::gallery::handler::list_gallery,
        crate::features::gallery::handler::get_image,
        crate::features::gallery::handler::like_image,
        crate::features::moderation::handler::delete_images,
        crate::features::moderation::handler::admin_status,
    ),
    components(schemas(
        crate::error::ProblemDetails,
        crate::features::auth::handler::LoginForm,
        crate::features::auth::handler::LoginResponse,
        crate::features::generate::models::GenerateResponse,
        crate::features::gallery::models::UploadedImage,
        crate::features::gallery::models::GalleryItemView,
        crate::features::gallery::models::GalleryPage,
        crate::features::gallery::models::LikeResponse,
        crate::features::moderation::handler::DeleteImagesRequest,
        crate::features::moderation::handler::DeleteImagesResponse,
        crate::features::moderation::handler::AdminStatusResponse,
        crate::features::health::handler::HealthResponse,
    )),
    modifiers(&ApiServers),
    tags(
        (name = "Auth", description = "认证：口令登录、注销，会话通过 Cookie 下发。"),
        (
            name = "Generate",
            description = "图片生成：提交提示词与可选参考图，走上游凭证轮换。"
        ),
        (name = "Gallery", description = "画廊：分页浏览、详情、按 IP 去重的点赞。"),
        (name = "Admin", description = "管理端：批量删除与创建者 IP 封禁。"),
        (name = "Storage", description = "图片文件：生成结果与参考图的读取。"),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Imagen Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "图片生成画廊后端（Axum + utoipa）。注意：除 /health 与 /user_content 外，\
其余业务接口实际挂载在 `config.api.prefix`（默认 /api/v1）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;
