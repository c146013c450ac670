use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_PAGE_SIZE;

/// 一次分页查询的结果（不缓存）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub total_items: usize,
}

/// 规整后的分页参数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// page < 1 取 1；page_size 低于 `floor` 取 `floor`，无上限
    pub fn normalize(page: i64, page_size: i64, floor: usize) -> Self {
        let floor = floor.max(1);
        let page = usize::try_from(page).unwrap_or(0).max(1);
        let page_size = usize::try_from(page_size).unwrap_or(0).max(floor);
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// 对已过滤的序列切页。越界页返回空 items，总数照常报告。
pub fn paginate<T, I>(items: I, req: PageRequest) -> Page<T>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    let iter = items.into_iter();
    let total_items = iter.len();
    let total_pages = total_items.div_ceil(req.page_size);
    let items = iter.skip(req.offset()).take(req.page_size).collect();

    Page {
        items,
        total_pages,
        total_items,
    }
}
