use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::auth::SessionService;
use crate::features::gallery::GalleryStore;
use crate::features::generate::GenerationClient;
use crate::features::moderation::ModerationGuard;
use crate::features::storage::BlobStore;

/// 应用共享状态。
///
/// 所有成员都是 `Arc`，`clone` 即可跨 handler 共享；
/// 集成测试可以用内存配置直接构造。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gallery: Arc<GalleryStore>,
    pub moderation: Arc<ModerationGuard>,
    pub blobs: Arc<BlobStore>,
    pub generator: Arc<GenerationClient>,
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let generator = GenerationClient::new(&config.upstream)?;
        let blobs = BlobStore::new(&config.storage);
        let sessions = SessionService::new(&config.auth);

        Ok(Self {
            config: Arc::new(config),
            gallery: Arc::new(GalleryStore::new()),
            moderation: Arc::new(ModerationGuard::new()),
            blobs: Arc::new(blobs),
            generator: Arc::new(generator),
            sessions: Arc::new(sessions),
        })
    }
}
