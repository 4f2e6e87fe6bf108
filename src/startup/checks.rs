use crate::error::AppError;
use crate::state::AppState;

/// 启动自检：存储目录可写、上游配置可用。
///
/// 任何一项失败都应终止启动，带着问题上线只会把错误推迟到第一次请求。
pub async fn run_startup_checks(state: &AppState) -> Result<(), AppError> {
    state.blobs.ensure_dirs().await?;

    if !state.generator.is_configured() {
        return Err(AppError::Config(
            "上游未配置：APP_UPSTREAM_API_KEYS 与 upstream.fallback_url 至少需要其一".to_string(),
        ));
    }

    let key_count = state.generator.rotator().len();
    if key_count > 0 {
        tracing::info!(key_count, "上游凭证池已就绪，按轮换顺序使用");
    } else {
        tracing::info!("未配置凭证池，走固定回退地址");
    }

    let auth = &state.config.auth;
    if auth.site_password == "default_password" {
        tracing::warn!("站点口令仍为默认值，请通过 APP_AUTH_SITE_PASSWORD 覆盖");
    }
    if auth.admin_key == "default_admin_key" {
        tracing::warn!("管理口令仍为默认值，请通过 APP_AUTH_ADMIN_KEY 覆盖");
    }

    Ok(())
}
