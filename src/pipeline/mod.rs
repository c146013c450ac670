use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheStore, IDS_KEY, VIEW_KEY};
use crate::config::{Config, DEFAULT_CACHE_TTL_SECS, DEFAULT_FETCH_CONCURRENCY, DEFAULT_PAGE_SIZE};
use crate::core::{decode_identifiers, project, ItemId, View, ViewRecord};
use crate::error::{FetchError, RetrievalError, Stage};
use crate::query::{self, Page};
use crate::source::{BoundedFetcher, HttpSource, RemoteSource};
use crate::stats::{PipelineStats, StatsReport};

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub ttl: Duration,
    pub fetch_concurrency: usize,
    /// 分页默认值兼下限
    pub page_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            ttl: cfg.cache_ttl(),
            fetch_concurrency: cfg.fetch_concurrency,
            page_size: cfg.page_size,
        }
    }
}

/// 检索流水线：id 列表 -> 扇出拉取 -> 投影，两级结果各自 cache-aside。
///
/// 缓存 store 由外部注入，同一进程内可以存在多条互不干扰的流水线。
/// 任何阶段失败都包装为 `RetrievalError` 返回，不做自动重试。
pub struct Pipeline {
    source: Arc<dyn RemoteSource>,
    fetcher: BoundedFetcher,
    store: Arc<CacheStore>,
    stats: Arc<PipelineStats>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn RemoteSource>,
        store: Arc<CacheStore>,
        options: PipelineOptions,
    ) -> Self {
        let stats = Arc::new(PipelineStats::new());
        let fetcher = BoundedFetcher::new(source.clone(), options.fetch_concurrency, stats.clone());
        Self {
            source,
            fetcher,
            store,
            stats,
            options,
        }
    }

    /// 按配置装配 HTTP 上游与缓存
    pub fn from_config(cfg: &Config) -> Result<Self, reqwest::Error> {
        let source = Arc::new(HttpSource::new(cfg.base_url.clone(), cfg.request_timeout())?);
        let store = if cfg.single_flight {
            CacheStore::with_single_flight()
        } else {
            CacheStore::new()
        };
        Ok(Self::new(source, Arc::new(store), PipelineOptions::from(cfg)))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// 当前视图；TTL 内重复调用不会触发任何上游请求
    pub async fn get_view(&self) -> Result<View, RetrievalError> {
        let result = self.build_view().await;
        if let Err(e) = &result {
            self.stats.record_failure();
            tracing::warn!("{}", e);
        }
        result
    }

    async fn build_view(&self) -> Result<View, RetrievalError> {
        let ttl = self.options.ttl;

        let ids = self
            .store
            .get_or_compute(IDS_KEY, ttl, || self.list_identifiers())
            .await
            .map_err(|e| RetrievalError::new(Stage::Identifiers, e))?;

        // 健康的上游返回空列表本身就是异常，与传输失败区分
        if ids.is_empty() {
            return Err(RetrievalError::new(Stage::Identifiers, FetchError::EmptyResult));
        }

        self.store
            .get_or_compute(VIEW_KEY, ttl, || self.resolve(&ids))
            .await
            .map_err(|e| RetrievalError::new(Stage::Records, e))
    }

    async fn list_identifiers(&self) -> Result<Vec<ItemId>, FetchError> {
        self.stats.record_list_request();
        let body = self.source.list_identifiers().await?;
        let ids = decode_identifiers(&body)?;
        tracing::debug!("upstream listed {} identifiers", ids.len());
        Ok(ids)
    }

    async fn resolve(&self, ids: &[ItemId]) -> Result<Vec<ViewRecord>, FetchError> {
        let started = Instant::now();
        let records = self.fetcher.fetch_all(ids).await?;
        let view = project(records);

        if view.is_empty() {
            return Err(FetchError::EmptyResult);
        }

        let elapsed = started.elapsed();
        self.stats.record_rebuild(view.len(), elapsed);
        tracing::info!(
            "Rebuilt view: {} items from {} ids in {:?}",
            view.len(),
            ids.len(),
            elapsed
        );
        Ok(view)
    }

    /// 过滤 + 分页；见 `query::query_with_floor`
    pub async fn query(
        &self,
        search_term: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> Result<Page<ViewRecord>, RetrievalError> {
        let view = self.get_view().await?;
        Ok(query::query_with_floor(
            &view,
            search_term,
            page,
            page_size,
            self.options.page_size,
        ))
    }

    /// 丢弃两级缓存并立即重建
    pub async fn refresh(&self) -> Result<View, RetrievalError> {
        self.store.invalidate(IDS_KEY);
        self.store.invalidate(VIEW_KEY);
        tracing::info!("Cache invalidated, rebuilding view");
        self.get_view().await
    }

    pub fn stats(&self) -> StatsReport {
        let mut report = self.stats.snapshot();
        report.cache_hits = self.store.hits();
        report.cache_misses = self.store.misses();
        report.cached_entries = self.store.len();
        report
    }
}
