use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::AppError;

use super::models::{GalleryItemView, GalleryPage, GalleryRecord, SortKey};

/// 画廊存储（进程内、易失）。
///
/// 记录集合与点赞台账放在同一把锁下，点赞的“查重 + 计数 + 记账”
/// 构成单个临界区，并发下不会丢更新。读取走快照复制，排序与序列化
/// 不持锁进行。
pub struct GalleryStore {
    inner: RwLock<GalleryInner>,
}

#[derive(Default)]
struct GalleryInner {
    records: Vec<GalleryRecord>,
    /// 点赞台账：IP -> 已点赞的图片 ID 集合，只增不删
    likes: HashMap<String, HashSet<String>>,
}

impl GalleryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GalleryInner::default()),
        }
    }

    /// 追加一条新记录。ID 由结果 Blob 名派生，此处不再分配。
    pub fn append(&self, record: GalleryRecord) {
        self.write().records.push(record);
    }

    /// 分页读取：复制快照 -> 稳定排序 -> 切片。
    ///
    /// 稳定排序保证同值条目保持插入顺序；page 从 1 开始。
    pub fn list(&self, page: u32, per_page: u32, sort: SortKey, client_ip: &str) -> GalleryPage {
        let (mut snapshot, liked_ids) = {
            let inner = self.read();
            let liked = inner.likes.get(client_ip).cloned().unwrap_or_default();
            (inner.records.clone(), liked)
        };

        match sort {
            SortKey::Newest => snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::Oldest => snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortKey::Likes => snapshot.sort_by(|a, b| b.likes.cmp(&a.likes)),
        }

        let total = snapshot.len();
        let page = page.max(1);
        let start = (page as usize - 1).saturating_mul(per_page as usize);
        let end = start.saturating_add(per_page as usize).min(total);
        let has_more = end < total;

        let images = if start >= total {
            Vec::new()
        } else {
            snapshot[start..end]
                .iter()
                .map(|r| GalleryItemView::from_record(r, liked_ids.contains(&r.id)))
                .collect()
        };

        GalleryPage {
            images,
            has_more,
            total,
            page,
            per_page,
        }
    }

    /// 单条查询，附带调用方是否已点赞。
    pub fn get(&self, id: &str, client_ip: &str) -> Result<GalleryItemView, AppError> {
        let inner = self.read();
        let user_liked = inner
            .likes
            .get(client_ip)
            .is_some_and(|ids| ids.contains(id));
        inner
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| GalleryItemView::from_record(r, user_liked))
            .ok_or_else(|| AppError::NotFound(format!("图片不存在: {id}")))
    }

    /// 点赞：同一 IP 重复点赞是错误而非幂等成功。
    ///
    /// 查重失败时不产生任何副作用；成功则计数 +1 并记入台账，
    /// 整个过程在一个临界区内完成。
    pub fn like(&self, id: &str, client_ip: &str) -> Result<u64, AppError> {
        let mut inner = self.write();

        if inner
            .likes
            .get(client_ip)
            .is_some_and(|ids| ids.contains(id))
        {
            return Err(AppError::AlreadyLiked);
        }

        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("图片不存在: {id}")))?;
        record.likes += 1;
        let likes = record.likes;

        inner
            .likes
            .entry(client_ip.to_string())
            .or_default()
            .insert(id.to_string());

        Ok(likes)
    }

    /// 按 ID 批量移除，原子地用保留分区替换集合，返回被移除的记录。
    ///
    /// Blob 清理与封禁由调用方基于返回值处理（存储层不持有 BlobStore）。
    pub fn remove_by_ids(&self, ids: &HashSet<String>) -> Vec<GalleryRecord> {
        let mut inner = self.write();
        let (removed, kept): (Vec<_>, Vec<_>) = inner
            .records
            .drain(..)
            .partition(|r| ids.contains(&r.id));
        inner.records = kept;
        removed
    }

    /// 当前记录总数。
    pub fn total_images(&self) -> usize {
        self.read().records.len()
    }

    /// 全部记录的点赞总和（探活端点用）。
    pub fn total_likes(&self) -> u64 {
        self.read().records.iter().map(|r| r.likes).sum()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GalleryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GalleryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for GalleryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::GalleryStore;
    use crate::error::AppError;
    use crate::features::gallery::models::{GalleryRecord, SortKey, now_kst};

    fn record(id: &str, created_offset_secs: i64, likes: u64) -> GalleryRecord {
        GalleryRecord {
            id: id.to_string(),
            result_image: format!("/user_content/{id}.png"),
            prompt: format!("prompt-{id}"),
            uploaded_images: Vec::new(),
            response_text: String::new(),
            created_at: now_kst() + chrono::Duration::seconds(created_offset_secs),
            likes,
            creator_ip: "10.0.0.1".to_string(),
        }
    }

    fn store_with(n: usize) -> GalleryStore {
        let store = GalleryStore::new();
        for i in 0..n {
            store.append(record(&format!("img{i}"), i as i64, 0));
        }
        store
    }

    #[test]
    fn newest_is_reverse_of_oldest_without_ties() {
        let store = store_with(6);
        let newest = store.list(1, 10, SortKey::Newest, "ip");
        let oldest = store.list(1, 10, SortKey::Oldest, "ip");

        let mut newest_ids: Vec<_> = newest.images.iter().map(|i| i.id.clone()).collect();
        let oldest_ids: Vec<_> = oldest.images.iter().map(|i| i.id.clone()).collect();
        newest_ids.reverse();
        assert_eq!(newest_ids, oldest_ids);
    }

    #[test]
    fn pagination_boundaries() {
        // 20 条记录：第 2 页（每页 15）应恰好 5 条且无后续
        let store = store_with(20);
        let page = store.list(2, 15, SortKey::Newest, "ip");
        assert_eq!(page.images.len(), 5);
        assert!(!page.has_more);
        assert_eq!(page.total, 20);

        // 35 条记录：第 2 页应 15 条且还有后续
        let store = store_with(35);
        let page = store.list(2, 15, SortKey::Newest, "ip");
        assert_eq!(page.images.len(), 15);
        assert!(page.has_more);

        // 超出范围的页返回空页
        let page = store.list(9, 15, SortKey::Newest, "ip");
        assert!(page.images.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn likes_sort_is_stable_for_ties() {
        let store = GalleryStore::new();
        store.append(record("a", 0, 2));
        store.append(record("b", 1, 5));
        store.append(record("c", 2, 2));
        let page = store.list(1, 10, SortKey::Likes, "ip");
        let ids: Vec<_> = page.images.iter().map(|i| i.id.as_str()).collect();
        // 同为 2 赞的 a/c 保持插入顺序
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn like_dedup_per_ip() {
        let store = store_with(1);

        assert_eq!(store.like("img0", "1.1.1.1").expect("first like"), 1);
        // 同 IP 第二次点赞是错误，计数不变
        assert!(matches!(
            store.like("img0", "1.1.1.1"),
            Err(AppError::AlreadyLiked)
        ));
        let view = store.get("img0", "1.1.1.1").expect("get");
        assert_eq!(view.likes, 1);
        assert!(view.user_liked);

        // 其他 IP 独立计数
        assert_eq!(store.like("img0", "2.2.2.2").expect("other ip"), 2);
    }

    #[test]
    fn like_unknown_id_is_not_found() {
        let store = store_with(1);
        assert!(matches!(
            store.like("ghost", "1.1.1.1"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn remove_by_ids_partitions_collection() {
        let store = store_with(4);
        let ids: HashSet<String> = ["img1".to_string(), "img3".to_string()].into();
        let removed = store.remove_by_ids(&ids);

        assert_eq!(removed.len(), 2);
        assert_eq!(store.total_images(), 2);
        assert!(store.get("img1", "ip").is_err());
        assert!(store.get("img0", "ip").is_ok());
    }

    #[test]
    fn user_liked_flag_in_list() {
        let store = store_with(2);
        store.like("img0", "1.1.1.1").expect("like");
        let page = store.list(1, 10, SortKey::Oldest, "1.1.1.1");
        assert!(page.images[0].user_liked);
        assert!(!page.images[1].user_liked);

        let other = store.list(1, 10, SortKey::Oldest, "9.9.9.9");
        assert!(!other.images[0].user_liked);
    }
}
