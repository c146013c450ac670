pub mod matcher;
pub mod page;
pub mod server;

pub use matcher::*;
pub use page::*;
pub use server::*;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::core::ViewRecord;

/// 过滤 + 分页（下限为默认的 10）
pub fn query(
    view: &[ViewRecord],
    search_term: Option<&str>,
    page: i64,
    page_size: i64,
) -> Page<ViewRecord> {
    query_with_floor(view, search_term, page, page_size, DEFAULT_PAGE_SIZE)
}

/// 过滤 + 分页，`floor` 同时作为默认页大小与下限。
///
/// 过滤保持视图原有顺序，因此同一视图上的结果是确定的。
pub fn query_with_floor(
    view: &[ViewRecord],
    search_term: Option<&str>,
    page: i64,
    page_size: i64,
    floor: usize,
) -> Page<ViewRecord> {
    let matcher = create_matcher(search_term);
    let filtered: Vec<ViewRecord> = view
        .iter()
        .filter(|r| matcher.matches(r))
        .cloned()
        .collect();

    paginate(filtered, PageRequest::normalize(page, page_size, floor))
}
