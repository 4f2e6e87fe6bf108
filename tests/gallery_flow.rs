use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use imagen_backend::features::gallery::models::{GalleryRecord, now_kst};
use imagen_backend::features::storage::BlobKind;
use imagen_backend::{AppConfig, AppState, build_app};

fn test_state(tag: &str) -> AppState {
    let base = std::env::temp_dir().join(format!("imagen-gallery-flow-{tag}"));
    let mut config = AppConfig::default();
    config.upstream.api_keys = Vec::new();
    config.upstream.fallback_url = Some("http://example.invalid/gen".to_string());
    config.auth.site_password = "member-pass".to_string();
    config.auth.admin_key = "admin-pass".to_string();
    config.storage.upload_dir = base.join("uploads").to_string_lossy().into_owned();
    config.storage.result_dir = base.join("results").to_string_lossy().into_owned();
    AppState::from_config(config).expect("build state")
}

fn seed_record(state: &AppState, id: &str, creator_ip: &str) {
    state.gallery.append(GalleryRecord {
        id: id.to_string(),
        result_image: format!("/user_content/{id}.png"),
        prompt: "a cat in space".to_string(),
        uploaded_images: Vec::new(),
        response_text: String::new(),
        created_at: now_kst(),
        likes: 0,
        creator_ip: creator_ip.to_string(),
    });
    state.moderation.record_creator(id, creator_ip);
}

async fn login(app: &Router, password: &str) -> (StatusCode, Option<String>) {
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::from(format!("password={password}")))
                .expect("build request"),
        )
        .await
        .expect("send request");

    let status = res.status();
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    (status, cookie)
}

async fn json_body(res: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn get_with(cookie: &str, ip: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .expect("build request")
}

fn post_with(cookie: &str, ip: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .expect("build request")
}

#[tokio::test]
async fn login_gates_gallery_access() {
    let app = build_app(test_state("login"));

    // 错误口令
    let (status, cookie) = login(&app, "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());

    // 未登录访问画廊
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/gallery")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/problem+json")
    );

    // 正确口令后可访问
    let (status, cookie) = login(&app, "member-pass").await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("session cookie");

    let res = app
        .clone()
        .oneshot(get_with(&cookie, "10.0.0.1", "/api/v1/gallery"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::OK);
    let v = json_body(res).await;
    assert_eq!(v["total"], 0);
    assert_eq!(v["has_more"], false);

    // 注销后会话立即失效
    let res = app
        .clone()
        .oneshot(post_with(&cookie, "10.0.0.1", "/api/v1/auth/logout"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_with(&cookie, "10.0.0.1", "/api/v1/gallery"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn like_is_deduplicated_per_ip() {
    let state = test_state("like");
    seed_record(&state, "img-1", "9.9.9.9");
    let app = build_app(state);

    let (_, cookie) = login(&app, "member-pass").await;
    let cookie = cookie.expect("session cookie");

    let res = app
        .clone()
        .oneshot(post_with(&cookie, "1.1.1.1", "/api/v1/gallery/img-1/like"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::OK);
    let v = json_body(res).await;
    assert_eq!(v["likes"], 1);
    assert_eq!(v["user_liked"], true);

    // 同一 IP 重复点赞被拒绝，计数不变
    let res = app
        .clone()
        .oneshot(post_with(&cookie, "1.1.1.1", "/api/v1/gallery/img-1/like"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = json_body(res).await;
    assert_eq!(v["code"], "ALREADY_LIKED");

    // 其他 IP 不受影响
    let res = app
        .clone()
        .oneshot(post_with(&cookie, "2.2.2.2", "/api/v1/gallery/img-1/like"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::OK);
    let v = json_body(res).await;
    assert_eq!(v["likes"], 2);

    // 详情视角：1.1.1.1 已点赞，3.3.3.3 未点赞
    let res = app
        .clone()
        .oneshot(get_with(&cookie, "1.1.1.1", "/api/v1/gallery/img-1"))
        .await
        .expect("send request");
    let v = json_body(res).await;
    assert_eq!(v["user_liked"], true);

    let res = app
        .clone()
        .oneshot(get_with(&cookie, "3.3.3.3", "/api/v1/gallery/img-1"))
        .await
        .expect("send request");
    let v = json_body(res).await;
    assert_eq!(v["user_liked"], false);
}

#[tokio::test]
async fn admin_delete_bans_creator_and_blocks_requests() {
    let state = test_state("admin");
    state.blobs.ensure_dirs().await.expect("ensure dirs");
    for (id, ip) in [("img-a", "9.9.9.9"), ("img-b", "8.8.8.8")] {
        state
            .blobs
            .put(BlobKind::Result, &format!("{id}.png"), b"png-bytes")
            .await
            .expect("seed blob");
        seed_record(&state, id, ip);
    }
    let app = build_app(state);

    // 普通会话不能调用删除
    let (_, member_cookie) = login(&app, "member-pass").await;
    let member_cookie = member_cookie.expect("session cookie");
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/images/delete")
                .header(header::COOKIE, &member_cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::from(r#"{"image_ids":["img-a"],"ban_users":true}"#))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // 管理会话删除并封禁创建者
    let (_, admin_cookie) = login(&app, "admin-pass").await;
    let admin_cookie = admin_cookie.expect("admin cookie");
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/images/delete")
                .header(header::COOKIE, &admin_cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::from(r#"{"image_ids":["img-a","ghost"],"ban_users":true}"#))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::OK);
    let v = json_body(res).await;
    assert_eq!(v["deleted_count"], 1);
    assert_eq!(v["banned_ips_count"], 1);

    // 被删记录消失，其余保留
    let res = app
        .clone()
        .oneshot(get_with(&admin_cookie, "10.0.0.1", "/api/v1/gallery"))
        .await
        .expect("send request");
    let v = json_body(res).await;
    assert_eq!(v["total"], 1);
    assert_eq!(v["images"][0]["id"], "img-b");

    // 被删记录的 Blob 同步清理，未删记录的仍可读取
    let res = app
        .clone()
        .oneshot(get_with(&admin_cookie, "10.0.0.1", "/user_content/img-a.png"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(get_with(&admin_cookie, "10.0.0.1", "/user_content/img-b.png"))
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::OK);

    // 被封禁的创建者 IP 从此被拒绝（包括登录）
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/gallery")
                .header("x-forwarded-for", "9.9.9.9")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let v = json_body(res).await;
    assert_eq!(v["code"], "IP_BANNED");

    // 探活不受封禁影响
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-forwarded-for", "9.9.9.9")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::OK);

    // 管理端状态反映删除与封禁结果
    let res = app
        .clone()
        .oneshot(get_with(&admin_cookie, "10.0.0.1", "/api/v1/admin/status"))
        .await
        .expect("send request");
    let v = json_body(res).await;
    assert_eq!(v["is_admin"], true);
    assert_eq!(v["banned_ips_count"], 1);
    assert_eq!(v["total_images"], 1);
}

#[tokio::test]
async fn empty_delete_request_is_rejected() {
    let app = build_app(test_state("empty-delete"));

    let (_, admin_cookie) = login(&app, "admin-pass").await;
    let admin_cookie = admin_cookie.expect("admin cookie");

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/images/delete")
                .header(header::COOKIE, &admin_cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::from(r#"{"image_ids":[]}"#))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v = json_body(res).await;
    assert_eq!(v["code"], "VALIDATION_FAILED");
}
