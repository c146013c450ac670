use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

type AnyValue = Arc<dyn Any + Send + Sync>;

/// 缓存条目：写入后不可变，刷新时整体替换
#[derive(Clone)]
pub struct CacheEntry {
    value: AnyValue,
    expires_at: Instant,
}

impl CacheEntry {
    /// 固定 TTL，从写入时刻算起，不做滑动续期
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

/// Cache-aside 存储（DashMap 实现）。
///
/// 按字符串 key 存放类型擦除的值，同一个 store 可同时缓存 id 列表与视图。
/// 默认允许同 key 并发 miss 各自计算（后写覆盖）；`single_flight` 模式下
/// 同 key 的 miss 串行化，后到者复用先到者写入的结果。
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    inflight: Option<DashMap<String, Arc<AsyncMutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            inflight: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_single_flight() -> Self {
        Self {
            inflight: Some(DashMap::new()),
            ..Self::new()
        }
    }

    pub fn is_single_flight(&self) -> bool {
        self.inflight.is_some()
    }

    /// 读取未过期且类型匹配的值
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if !entry.is_fresh(now) {
            return None;
        }
        entry.value.clone().downcast::<T>().ok()
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: &str, value: Arc<T>, ttl: Duration) {
        let now = Instant::now();
        self.purge_expired_at(now);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value as AnyValue,
                expires_at: now + ttl,
            },
        );
    }

    /// 命中直接返回；未命中执行 `compute`，成功则以 now+ttl 写入。
    ///
    /// `compute` 失败时错误原样返回，store 不变（不做负缓存）。
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(v) = self.get::<T>(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache hit: {}", key);
            return Ok(v);
        }

        let _guard = match &self.inflight {
            Some(locks) => {
                let lock = locks.entry(key.to_string()).or_default().clone();
                let guard = lock.lock_owned().await;
                // 等锁期间可能已有其他调用方写入
                if let Some(v) = self.get::<T>(key) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("cache hit after single-flight wait: {}", key);
                    return Ok(v);
                }
                Some(guard)
            }
            None => None,
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("cache miss: {}", key);

        let value = Arc::new(compute().await?);
        self.insert(key, value.clone(), ttl);
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// 清理过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_fresh(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_skips_compute() {
        let store = CacheStore::new();
        let calls = AtomicUsize::new(0);

        let a = store
            .get_or_compute("ids", TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(vec![1u64, 2, 3])
            })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(599)).await;

        let b = store
            .get_or_compute("ids", TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(vec![9u64])
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.hits(), 1);
        assert_eq!(store.misses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_exactly_at_ttl() {
        let store = CacheStore::new();
        store.insert("view", Arc::new(1u32), TTL);

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert_eq!(store.get::<u32>("view").as_deref(), Some(&1));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(store.get::<u32>("view").is_none());

        let v = store
            .get_or_compute("view", TTL, || async { Ok::<_, ()>(2u32) })
            .await
            .unwrap();
        assert_eq!(*v, 2);
    }

    #[tokio::test]
    async fn failed_compute_leaves_store_unchanged() {
        let store = CacheStore::new();
        let err = store
            .get_or_compute::<u32, _, _, _>("ids", TTL, || async { Err("upstream down") })
            .await
            .unwrap_err();
        assert_eq!(err, "upstream down");
        assert!(store.is_empty());

        // 失败后的下一次调用仍会重新计算
        let v = store
            .get_or_compute("ids", TTL, || async { Ok::<_, &str>(5u32) })
            .await
            .unwrap();
        assert_eq!(*v, 5);
    }

    #[tokio::test]
    async fn type_mismatch_is_a_miss_and_gets_replaced() {
        let store = CacheStore::new();
        store.insert("ids", Arc::new("not a list".to_string()), TTL);

        let v = store
            .get_or_compute("ids", TTL, || async { Ok::<_, ()>(vec![7u64]) })
            .await
            .unwrap();
        assert_eq!(*v, vec![7]);
        assert_eq!(store.len(), 1);
        assert!(store.get::<String>("ids").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired() {
        let store = CacheStore::new();
        store.insert("short", Arc::new(1u8), Duration::from_secs(1));
        store.insert("long", Arc::new(2u8), TTL);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.invalidate("long"));
        assert!(!store.invalidate("long"));
    }

    #[tokio::test]
    async fn concurrent_misses_may_each_compute_without_single_flight() {
        let store = Arc::new(CacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Barrier::new(2));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let (store, calls, gate) = (store.clone(), calls.clone(), gate.clone());
            handles.push(tokio::spawn(async move {
                store
                    .get_or_compute("view", TTL, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // 两个调用都进入 compute 后才返回
                        gate.wait().await;
                        Ok::<_, ()>(1u32)
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(*h.await.unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn single_flight_shares_first_result() {
        let store = Arc::new(CacheStore::with_single_flight());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (store, calls) = (store.clone(), calls.clone());
            handles.push(tokio::spawn(async move {
                store
                    .get_or_compute("view", TTL, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ()>(42u32)
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(*h.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.misses(), 1);
        assert_eq!(store.hits(), 7);
    }
}
