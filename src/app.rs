use axum::{Router, extract::DefaultBodyLimit};
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cors::build_cors_layer;
use crate::features::auth::create_auth_router;
use crate::features::gallery::create_gallery_router;
use crate::features::generate::create_generate_router;
use crate::features::health::create_health_router;
use crate::features::moderation::{ban_guard_middleware, create_admin_router};
use crate::features::storage::create_storage_router;
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 请求体上限：两张 15MB 参考图加表单开销的余量。
const MAX_BODY_BYTES: usize = 35 * 1024 * 1024;

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    // 图片响应本身已压缩，排除在外；保留默认最小大小阈值
    SizeAbove::default()
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/octet-stream"))
}

/// 组装完整应用路由（集成测试直接复用）。
pub fn build_app(state: AppState) -> Router {
    let api_router = Router::<AppState>::new()
        .merge(create_auth_router())
        .merge(create_generate_router())
        .merge(create_gallery_router())
        .merge(create_admin_router());

    let mut app = Router::<AppState>::new()
        .merge(create_health_router())
        .merge(create_storage_router())
        .nest(&state.config.api.prefix, api_router)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            ban_guard_middleware,
        ))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new().compress_when(compression_predicate()))
        .with_state(state.clone());

    if let Some(cors) = build_cors_layer(&state.config.cors) {
        app = app.layer(cors);
    }

    app
}

#[cfg(test)]
mod compression_predicate_tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        // 命中 SizeAbove（默认 32B），避免因为 body 太小导致测试不稳定
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(vec![b'x'; 2048]))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn compression_skips_images_but_keeps_json() {
        assert!(!should_compress_for("image/png"));
        assert!(!should_compress_for("application/octet-stream"));
        assert!(should_compress_for("application/json"));
    }
}
