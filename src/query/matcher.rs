use std::sync::Arc;

use crate::core::ViewRecord;

/// Matcher 抽象接口，定义过滤行为
pub trait Matcher: Send + Sync {
    fn matches(&self, record: &ViewRecord) -> bool;
}

/// 空搜索词：全部命中
pub struct MatchAll;

impl Matcher for MatchAll {
    fn matches(&self, _record: &ViewRecord) -> bool {
        true
    }
}

/// 大小写不敏感的子串匹配：title / url / author 任一包含即命中
pub struct SubstringMatcher {
    needle: String,
}

impl SubstringMatcher {
    /// `needle` 须已做过 trim + 小写化
    pub fn new(needle: String) -> Self {
        Self { needle }
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }
}

impl Matcher for SubstringMatcher {
    fn matches(&self, record: &ViewRecord) -> bool {
        [&record.title, &record.url, &record.author]
            .iter()
            .any(|field| field.to_lowercase().contains(&self.needle))
    }
}

/// 搜索词规整：trim + 小写；空串视为未提供
pub fn normalize_term(term: Option<&str>) -> Option<String> {
    term.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty())
}

/// 匹配器工厂
pub fn create_matcher(term: Option<&str>) -> Arc<dyn Matcher> {
    match normalize_term(term) {
        Some(needle) => Arc::new(SubstringMatcher::new(needle)),
        None => Arc::new(MatchAll),
    }
}
