/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 路由组装模块
pub mod app;

/// OpenAPI 文档模块
pub mod openapi;

/// 启动检查模块
pub mod startup;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出管理模块
pub mod shutdown;

/// CORS 中间件构建模块
pub mod cors;

/// request_id 透传模块
pub mod request_id;

// 导出常用类型供外部使用
pub use app::build_app;
pub use config::AppConfig;
pub use error::AppError;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;
