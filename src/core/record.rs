use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FetchError;

/// 上游条目 ID（newstories.json 中的整数）
pub type ItemId = u64;

/// 条目类型（对应上游 `type` 字段）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Job,
    Story,
    Comment,
    Poll,
    #[serde(rename = "pollopt")]
    PollOption,
    /// 上游新增的类型不应让整轮构建失败
    #[serde(other)]
    Unknown,
}

/// 字段值为 JSON `null` 时与缺失同样处理，取默认值
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// 解码后的上游条目。
///
/// 关系字段（parent / kids / poll / parts）仅作信息保留，核心流程不做遍历。
/// 缺失字段一律取默认值，上游对不同类型的条目只返回部分字段。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: Option<ItemKind>,
    #[serde(rename = "by", deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    /// 创建时间（Unix 秒）
    #[serde(deserialize_with = "null_as_default")]
    pub time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub score: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub descendants: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub deleted: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub dead: bool,
    pub parent: Option<ItemId>,
    pub poll: Option<ItemId>,
    #[serde(deserialize_with = "null_as_default")]
    pub kids: Vec<ItemId>,
    #[serde(deserialize_with = "null_as_default")]
    pub parts: Vec<ItemId>,
}

impl Record {
    /// 无 url 的条目（Ask HN / 纯文本讨论）不进入视图
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// 解码单条记录。
///
/// 上游对不存在的 id 返回 `200 null`，这里映射为 `Ok(None)`（等同条目不可用）；
/// 其余无法解析的 payload 视为上游契约被破坏，返回 `FetchError::Decode`。
pub fn decode_record(id: ItemId, bytes: &[u8]) -> Result<Option<Record>, FetchError> {
    serde_json::from_slice::<Option<Record>>(bytes).map_err(|source| FetchError::Decode {
        what: format!("item {}", id),
        source,
    })
}

/// 解码 newstories.json 的 id 列表。
///
/// 重复 id 只保留首次出现的位置，保证一次构建周期内 id 唯一。
pub fn decode_identifiers(bytes: &[u8]) -> Result<Vec<ItemId>, FetchError> {
    let ids: Vec<ItemId> = serde_json::from_slice(bytes).map_err(|source| FetchError::Decode {
        what: "identifier list".to_string(),
        source,
    })?;

    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    Ok(ids.into_iter().filter(|id| seen.insert(*id)).collect())
}
