use std::sync::Mutex;

/// 上游 API Key 凭证池，轮询取用。
///
/// 读取游标与失效剔除在同一把锁内完成，避免并发下漏发或重发同一个 Key。
/// 池只会收缩：被上游确认失效的 Key 永久移除，运行期不会再加回来。
pub struct KeyRotator {
    pool: Mutex<CredentialPool>,
}

#[derive(Debug)]
struct CredentialPool {
    keys: Vec<String>,
    cursor: usize,
}

impl KeyRotator {
    /// 从配置的 Key 列表构建凭证池，空白项会被丢弃。
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            pool: Mutex::new(CredentialPool { keys, cursor: 0 }),
        }
    }

    /// 当前存活的 Key 数量。
    pub fn len(&self) -> usize {
        self.lock().keys.len()
    }

    /// 凭证池是否为空（未配置或全部失效）。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 轮询取出下一个 Key 并推进游标；池为空时返回 `None`。
    pub fn next_key(&self) -> Option<String> {
        let mut pool = self.lock();
        if pool.keys.is_empty() {
            return None;
        }
        let idx = pool.cursor % pool.keys.len();
        let key = pool.keys[idx].clone();
        pool.cursor = (idx + 1) % pool.keys.len();
        Some(key)
    }

    /// 永久移除一个被上游判定失效的 Key，并修正游标使轮换顺序不被打乱。
    pub fn invalidate(&self, key: &str) {
        let mut pool = self.lock();
        let Some(pos) = pool.keys.iter().position(|k| k == key) else {
            return;
        };
        pool.keys.remove(pos);
        if pool.keys.is_empty() {
            pool.cursor = 0;
            return;
        }
        // 被移除的元素位于游标之前时，后续元素整体前移一位
        if pos < pool.cursor {
            pool.cursor -= 1;
        }
        pool.cursor %= pool.keys.len();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CredentialPool> {
        // 锁内不会 panic，中毒视为不可恢复
        self.pool.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::KeyRotator;

    #[test]
    fn rotates_round_robin() {
        let r = KeyRotator::new(["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(r.next_key().as_deref(), Some("a"));
        assert_eq!(r.next_key().as_deref(), Some("b"));
        assert_eq!(r.next_key().as_deref(), Some("c"));
        assert_eq!(r.next_key().as_deref(), Some("a"));
    }

    #[test]
    fn drops_blank_entries() {
        let r = KeyRotator::new(["  ".to_string(), "k1".to_string(), String::new()]);
        assert_eq!(r.len(), 1);
        assert_eq!(r.next_key().as_deref(), Some("k1"));
    }

    #[test]
    fn invalidated_key_is_never_served_again() {
        let r = KeyRotator::new(["k1".to_string(), "k2".to_string(), "k3".to_string()]);
        assert_eq!(r.next_key().as_deref(), Some("k1"));
        r.invalidate("k2");
        assert_eq!(r.len(), 2);
        // 剩余 Key 继续轮换，k2 不再出现
        for _ in 0..10 {
            let k = r.next_key().expect("pool not empty");
            assert_ne!(k, "k2");
        }
    }

    #[test]
    fn cursor_stays_consistent_after_removal_before_cursor() {
        let r = KeyRotator::new(["k1".to_string(), "k2".to_string(), "k3".to_string()]);
        // 游标推进到 k3 之前
        assert_eq!(r.next_key().as_deref(), Some("k1"));
        assert_eq!(r.next_key().as_deref(), Some("k2"));
        // 移除游标之前的 k1，下一个仍应是 k3
        r.invalidate("k1");
        assert_eq!(r.next_key().as_deref(), Some("k3"));
        assert_eq!(r.next_key().as_deref(), Some("k2"));
    }

    #[test]
    fn empty_pool_yields_none() {
        let r = KeyRotator::new(Vec::<String>::new());
        assert!(r.is_empty());
        assert_eq!(r.next_key(), None);

        let r = KeyRotator::new(["only".to_string()]);
        r.invalidate("only");
        assert_eq!(r.next_key(), None);
    }

    #[test]
    fn invalidate_unknown_key_is_noop() {
        let r = KeyRotator::new(["k1".to_string()]);
        r.invalidate("ghost");
        assert_eq!(r.len(), 1);
    }
}
