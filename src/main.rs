use std::net::SocketAddr;

use imagen_backend::startup::run_startup_checks;
use imagen_backend::{AppConfig, AppState, ShutdownManager, build_app};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagen_backend=info,tower_http=info".into()),
        )
        .init();

    let shutdown_manager = ShutdownManager::new();

    if let Err(e) = AppConfig::init_global() {
        tracing::error!("配置加载失败: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    if let Err(e) = shutdown_manager.start_signal_handler().await {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let state = match AppState::from_config(config.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("应用状态初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_startup_checks(&state).await {
        tracing::error!("启动自检失败: {}", e);
        std::process::exit(1);
    }

    let app = build_app(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("监听地址绑定失败 {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Generate API: http://{}{}/generate", addr, config.api.prefix);
    tracing::info!("Gallery API: http://{}{}/gallery", addr, config.api.prefix);

    let shutdown_timeout = config.shutdown.timeout_duration();
    let shutdown_for_server = shutdown_manager.clone();
    let graceful = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let reason = shutdown_for_server.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    // 在途的上游生成请求可能很长，收尾窗口由 shutdown.timeout_secs 兜底
    tokio::select! {
        result = graceful => {
            if let Err(e) = result {
                tracing::error!("服务器运行错误: {}", e);
                std::process::exit(1);
            }
            tracing::info!("服务器已优雅关闭");
        }
        _ = async {
            shutdown_manager.wait_for_shutdown().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!(
                "优雅退出超时（{} 秒），放弃等待在途请求",
                config.shutdown.timeout_secs
            );
        }
    }
}
