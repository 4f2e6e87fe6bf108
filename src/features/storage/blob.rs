use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::AppError;

/// Blob 归属目录。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// 用户上传的参考图
    Upload,
    /// 生成结果图
    Result,
}

/// 文件系统 Blob 存储。
///
/// 上传图与结果图分目录存放；文件名由服务端生成（UUID），
/// 读取前做安全名校验以杜绝路径穿越。
#[derive(Debug, Clone)]
pub struct BlobStore {
    upload_dir: PathBuf,
    result_dir: PathBuf,
}

/// 生成新的 Blob 文件名（结果图统一落盘为 PNG）。
pub fn new_blob_id() -> String {
    format!("{}.png", Uuid::new_v4())
}

/// 从公开访问路径（如 `/user_content/xxx.png`）剥离出 Blob 文件名。
pub fn blob_name_from_path(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    if is_safe_name(name) { Some(name) } else { None }
}

/// 文件名必须是纯名字：不含分隔符、不含 `..`、非空。
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

impl BlobStore {
    pub fn new(cfg: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&cfg.upload_dir),
            result_dir: PathBuf::from(&cfg.result_dir),
        }
    }

    /// 启动时确保两个目录存在。
    pub async fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.upload_dir, &self.result_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Storage(format!("创建存储目录 {dir:?} 失败: {e}")))?;
        }
        Ok(())
    }

    fn dir_of(&self, kind: BlobKind) -> &Path {
        match kind {
            BlobKind::Upload => &self.upload_dir,
            BlobKind::Result => &self.result_dir,
        }
    }

    /// 落盘一个 Blob。
    pub async fn put(&self, kind: BlobKind, name: &str, bytes: &[u8]) -> Result<(), AppError> {
        if !is_safe_name(name) {
            return Err(AppError::Validation("非法文件名".to_string()));
        }
        let path = self.dir_of(kind).join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("写入 {path:?} 失败: {e}")))?;
        Ok(())
    }

    /// 读取 Blob。两个目录都查（结果图优先），找不到返回 404。
    pub async fn get(&self, name: &str) -> Result<Vec<u8>, AppError> {
        if !is_safe_name(name) {
            return Err(AppError::NotFound("文件不存在".to_string()));
        }
        for dir in [&self.result_dir, &self.upload_dir] {
            let path = dir.join(name);
            match tokio::fs::read(&path).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(AppError::Storage(format!("读取 {path:?} 失败: {e}"))),
            }
        }
        Err(AppError::NotFound("文件不存在".to_string()))
    }

    /// 尽力而为地删除 Blob（两个目录都尝试），失败只记日志。
    pub async fn delete(&self, name: &str) {
        if !is_safe_name(name) {
            return;
        }
        for dir in [&self.result_dir, &self.upload_dir] {
            let path = dir.join(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = ?path, "Blob 已删除"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = ?path, error = %e, "删除 Blob 失败"),
            }
        }
    }
}
