use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{ItemId, Record};

/// 对外输出的条目投影
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub id: ItemId,
    pub title: String,
    pub url: String,
    pub author: String,
    pub time: DateTime<Utc>,
}

/// 当前已知的全部条目；缓存未命中时整体重建，不做增量修补
pub type View = Arc<Vec<ViewRecord>>;

impl From<Record> for ViewRecord {
    fn from(record: Record) -> Self {
        // 超出 chrono 可表示范围的时间戳退化为 epoch
        let time = Utc
            .timestamp_opt(record.time, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            id: record.id,
            title: record.title,
            url: record.url,
            author: record.author,
            time,
        }
    }
}

/// Record -> ViewRecord 的纯函数投影，保持输入顺序
pub fn project(records: Vec<Record>) -> Vec<ViewRecord> {
    records.into_iter().map(ViewRecord::from).collect()
}
