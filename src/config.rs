use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        7860
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// 日志格式
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_format() -> String {
        "full".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    #[serde(default = "ApiConfig::default_prefix")]
    pub prefix: String,
}

impl ApiConfig {
    fn default_prefix() -> String {
        "/api/v1".to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default)]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 是否允许携带凭证（Cookie），与 "*" 互斥
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

/// 上游生成服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API Key 凭证池（逗号分隔的环境变量 APP_UPSTREAM_API_KEYS 优先）
    #[serde(
        default = "UpstreamConfig::default_api_keys",
        alias = "api-keys",
        alias = "apiKeys"
    )]
    pub api_keys: Vec<String>,
    /// 端点模板，`{key}` 占位符会被当前轮换到的 Key 替换
    #[serde(default = "UpstreamConfig::default_endpoint_template")]
    pub endpoint_template: String,
    /// 无凭证池时的固定回退地址（凭证池与回退地址至少配置其一）
    #[serde(default = "UpstreamConfig::default_fallback_url")]
    pub fallback_url: Option<String>,
    /// 可选的静态 Bearer Token（不参与轮换）
    #[serde(default = "UpstreamConfig::default_bearer_token")]
    pub bearer_token: Option<String>,
    /// 上游请求超时（秒）
    #[serde(default = "UpstreamConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 单次生成的输出 token 上限
    #[serde(default = "UpstreamConfig::default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// 采样温度
    #[serde(default = "UpstreamConfig::default_temperature")]
    pub temperature: f32,
}

impl UpstreamConfig {
    // 含多个下划线的叶子键无法经由 Environment 源映射（分隔符歧义），
    // 因此这几项直接读取环境变量作为缺省值
    fn default_api_keys() -> Vec<String> {
        if let Ok(raw) = std::env::var("APP_UPSTREAM_API_KEYS") {
            return raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Vec::new()
    }
    fn default_fallback_url() -> Option<String> {
        std::env::var("APP_UPSTREAM_FALLBACK_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
    fn default_bearer_token() -> Option<String> {
        std::env::var("APP_UPSTREAM_BEARER_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
    fn default_endpoint_template() -> String {
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image-preview:generateContent?key={key}"
            .to_string()
    }
    fn default_timeout() -> u64 {
        300
    }
    fn default_max_output_tokens() -> u32 {
        4000
    }
    fn default_temperature() -> f32 {
        1.0
    }

    /// 上游请求超时
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_keys: Self::default_api_keys(),
            endpoint_template: Self::default_endpoint_template(),
            fallback_url: Self::default_fallback_url(),
            bearer_token: Self::default_bearer_token(),
            timeout_secs: Self::default_timeout(),
            max_output_tokens: Self::default_max_output_tokens(),
            temperature: Self::default_temperature(),
        }
    }
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 站点访问口令
    #[serde(default = "AuthConfig::default_site_password")]
    pub site_password: String,
    /// 管理员口令（登录即获得管理员会话）
    #[serde(default = "AuthConfig::default_admin_key")]
    pub admin_key: String,
    /// 会话有效期（秒）
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_secs: u64,
}

impl AuthConfig {
    fn default_site_password() -> String {
        std::env::var("APP_AUTH_SITE_PASSWORD").unwrap_or_else(|_| "default_password".to_string())
    }
    fn default_admin_key() -> String {
        std::env::var("APP_AUTH_ADMIN_KEY").unwrap_or_else(|_| "default_admin_key".to_string())
    }
    fn default_session_ttl() -> u64 {
        86400
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            site_password: Self::default_site_password(),
            admin_key: Self::default_admin_key(),
            session_ttl_secs: Self::default_session_ttl(),
        }
    }
}

/// Blob 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 上传参考图目录
    #[serde(default = "StorageConfig::default_upload_dir")]
    pub upload_dir: String,
    /// 生成结果图目录
    #[serde(default = "StorageConfig::default_result_dir")]
    pub result_dir: String,
}

impl StorageConfig {
    fn default_upload_dir() -> String {
        "/tmp/uploads".to_string()
    }
    fn default_result_dir() -> String {
        "/tmp/results".to_string()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: Self::default_upload_dir(),
            result_dir: Self::default_result_dir(),
        }
    }
}

/// 画廊配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// 默认每页条数
    #[serde(default = "GalleryConfig::default_per_page")]
    pub default_per_page: u32,
    /// 每页条数上限
    #[serde(default = "GalleryConfig::default_max_per_page")]
    pub max_per_page: u32,
}

impl GalleryConfig {
    fn default_per_page() -> u32 {
        15
    }
    fn default_max_per_page() -> u32 {
        100
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            default_per_page: Self::default_per_page(),
            max_per_page: Self::default_max_per_page(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 上游生成服务配置
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// 认证配置
    #[serde(default)]
    pub auth: AuthConfig,
    /// Blob 存储配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// 画廊配置
    #[serde(default)]
    pub gallery: GalleryConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖。
    ///
    /// 配置文件缺省时使用内置默认值，便于快速启动与测试。
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(File::with_name("config.toml").required(false))
            // 支持环境变量覆盖，例如：APP_API_PREFIX。
            // 含多个下划线的叶子键（如 gallery.default_per_page）无法经由该源
            // 设置，只能走配置文件；上游凭证相关的几项在 UpstreamConfig /
            // AuthConfig 的缺省值里直接读环境变量。
            .add_source(
                Environment::with_prefix("APP")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
