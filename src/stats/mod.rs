use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// 流水线运行计数（全部为原子计数，读写无需加锁）。
///
/// 命中/未命中由 `CacheStore` 自己计数，快照时再合并。
#[derive(Debug, Default)]
pub struct PipelineStats {
    list_requests: AtomicU64,
    item_requests: AtomicU64,
    items_dropped: AtomicU64,
    items_without_url: AtomicU64,
    view_rebuilds: AtomicU64,
    failures: AtomicU64,
    last_rebuild: Mutex<Option<RebuildInfo>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildInfo {
    pub at: DateTime<Utc>,
    pub items: usize,
    pub elapsed_ms: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_list_request(&self) {
        self.list_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_request(&self) {
        self.item_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_dropped(&self) {
        self.items_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_without_url(&self, n: usize) {
        self.items_without_url.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rebuild(&self, items: usize, elapsed: std::time::Duration) {
        self.view_rebuilds.fetch_add(1, Ordering::Relaxed);
        *self.last_rebuild.lock() = Some(RebuildInfo {
            at: Utc::now(),
            items,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn snapshot(&self) -> StatsReport {
        StatsReport {
            list_requests: self.list_requests.load(Ordering::Relaxed),
            item_requests: self.item_requests.load(Ordering::Relaxed),
            items_dropped: self.items_dropped.load(Ordering::Relaxed),
            items_without_url: self.items_without_url.load(Ordering::Relaxed),
            view_rebuilds: self.view_rebuilds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_rebuild: self.last_rebuild.lock().clone(),
            ..StatsReport::default()
        }
    }
}

/// 某一时刻的计数快照（`/status` 输出）
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// newstories.json 请求次数
    pub list_requests: u64,
    /// item/{id}.json 请求次数
    pub item_requests: u64,
    /// 非 2xx 或 null 而被丢弃的条目
    pub items_dropped: u64,
    pub items_without_url: u64,
    pub view_rebuilds: u64,
    pub failures: u64,
    pub last_rebuild: Option<RebuildInfo>,
    /// 缓存中当前条目数（含已过期未清理的）
    pub cached_entries: usize,
}

impl StatsReport {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════╗")?;
        writeln!(f, "║           hn-newest Pipeline Report              ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Cache:                                           ║")?;
        writeln!(f, "║   hits:         {:>10}                       ║", self.cache_hits)?;
        writeln!(f, "║   misses:       {:>10}                       ║", self.cache_misses)?;
        writeln!(
            f,
            "║   hit ratio:    {:>9.1}%                       ║",
            self.hit_ratio() * 100.0
        )?;
        writeln!(f, "║   entries:      {:>10}                       ║", self.cached_entries)?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║ Upstream:                                        ║")?;
        writeln!(f, "║   list reqs:    {:>10}                       ║", self.list_requests)?;
        writeln!(f, "║   item reqs:    {:>10}                       ║", self.item_requests)?;
        writeln!(f, "║   dropped:      {:>10}                       ║", self.items_dropped)?;
        writeln!(f, "║   no url:       {:>10}                       ║", self.items_without_url)?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║ View:                                            ║")?;
        writeln!(f, "║   rebuilds:     {:>10}                       ║", self.view_rebuilds)?;
        writeln!(f, "║   failures:     {:>10}                       ║", self.failures)?;
        if let Some(r) = &self.last_rebuild {
            writeln!(
                f,
                "║   last:  {:>6} items in {:>6} ms               ║",
                r.items, r.elapsed_ms
            )?;
        }
        writeln!(f, "╚══════════════════════════════════════════════════╝")?;
        Ok(())
    }
}
