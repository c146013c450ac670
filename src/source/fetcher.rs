use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::{decode_record, ItemId, Record};
use crate::error::FetchError;
use crate::source::client::RemoteSource;
use crate::stats::PipelineStats;

/// 扇出拉取：每个 id 一个任务，由信号量限制同时在途的请求数。
///
/// - 单条非 2xx / `null`：静默丢弃
/// - 解码失败 / 传输失败：整轮失败，但仍等全部任务结束后才返回
/// - 结果顺序为完成顺序，调用方不得依赖
pub struct BoundedFetcher {
    source: Arc<dyn RemoteSource>,
    limit: usize,
    stats: Arc<PipelineStats>,
}

impl BoundedFetcher {
    pub fn new(source: Arc<dyn RemoteSource>, limit: usize, stats: Arc<PipelineStats>) -> Self {
        Self {
            source,
            limit: limit.max(1),
            stats,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn fetch_all(&self, ids: &[ItemId]) -> Result<Vec<Record>, FetchError> {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut tasks = JoinSet::new();

        let mut seen = HashSet::with_capacity(ids.len());
        for &id in ids.iter().filter(|id| seen.insert(**id)) {
            let source = self.source.clone();
            let semaphore = semaphore.clone();
            let stats = self.stats.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| FetchError::Task(e.to_string()))?;

                stats.record_item_request();
                let Some(body) = source.fetch_record(id).await? else {
                    stats.record_item_dropped();
                    return Ok(None);
                };

                let record = decode_record(id, &body)?;
                if record.is_none() {
                    tracing::debug!("item {} returned null, dropping", id);
                    stats.record_item_dropped();
                }
                Ok::<_, FetchError>(record)
            });
        }

        let mut records = Vec::with_capacity(seen.len());
        let mut first_err: Option<FetchError> = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(FetchError::Task(e.to_string())));
            match outcome {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("fetch task failed: {}", e);
                    first_err.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_err {
            return Err(e);
        }

        // 上游可能对不同 id 返回同一条记录；按记录 id 再去重一次
        let mut seen_records = HashSet::with_capacity(records.len());
        records.retain(|r| seen_records.insert(r.id));

        let fetched = records.len();
        records.retain(Record::has_url);
        self.stats.record_without_url(fetched - records.len());

        Ok(records)
    }
}
