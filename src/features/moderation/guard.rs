use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// 审核状态（进程内、易失）。
///
/// 封禁集合与“图片 ID -> 创建者 IP”映射都只增不减；
/// 后者在记录被删除后仍可用于回溯创建者。
pub struct ModerationGuard {
    inner: RwLock<ModerationInner>,
}

#[derive(Default)]
struct ModerationInner {
    banned_ips: HashSet<String>,
    image_creators: HashMap<String, String>,
}

impl ModerationGuard {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ModerationInner::default()),
        }
    }

    /// 该 IP 是否被封禁。所有入站请求（除探活）都先过这一步。
    pub fn is_banned(&self, ip: &str) -> bool {
        self.read().banned_ips.contains(ip)
    }

    /// 合并封禁一批 IP（集合并集，幂等），返回本次传入的 IP 数。
    pub fn ban_all(&self, ips: impl IntoIterator<Item = String>) -> usize {
        let mut inner = self.write();
        let mut count = 0;
        for ip in ips {
            inner.banned_ips.insert(ip);
            count += 1;
        }
        count
    }

    /// 每次生成成功后记录创建者。
    pub fn record_creator(&self, image_id: &str, ip: &str) {
        self.write()
            .image_creators
            .insert(image_id.to_string(), ip.to_string());
    }

    /// 回查创建者 IP（删除流程对缺失内联 IP 的记录使用）。
    pub fn creator_of(&self, image_id: &str) -> Option<String> {
        self.read().image_creators.get(image_id).cloned()
    }

    /// 当前封禁 IP 数量。
    pub fn banned_count(&self) -> usize {
        self.read().banned_ips.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ModerationInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ModerationInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ModerationGuard {
    fn default() -> Self {
        Self::new()
    }
}
