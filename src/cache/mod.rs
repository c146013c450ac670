pub mod store;

pub use store::{CacheEntry, CacheStore};

/// id 列表缓存 key
pub const IDS_KEY: &str = "ids";
/// 视图缓存 key
pub const VIEW_KEY: &str = "view";
