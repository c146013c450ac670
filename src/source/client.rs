use async_trait::async_trait;

use crate::core::ItemId;
use crate::error::FetchError;

/// 上游只读数据源抽象。
///
/// 只负责取回原始字节，解码交给 `core::record`：
/// - 生产环境：`HttpSource`（reqwest）
/// - 测试：内存 mock
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// 当前“最新条目” id 列表的原始 JSON。
    ///
    /// 不可达或非 2xx 均返回错误。
    async fn list_identifiers(&self) -> Result<Vec<u8>, FetchError>;

    /// 单条记录的原始 JSON。
    ///
    /// 非 2xx 返回 `Ok(None)`（条目不可用，由调用方丢弃），
    /// 只有传输层失败才返回 `Err`。
    async fn fetch_record(&self, id: ItemId) -> Result<Option<Vec<u8>>, FetchError>;
}
