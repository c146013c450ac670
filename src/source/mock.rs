//! 内存版上游，供单元测试使用。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::ItemId;
use crate::error::FetchError;
use crate::source::client::RemoteSource;

#[derive(Clone, Debug)]
pub enum MockReply {
    Body(Vec<u8>),
    /// 非 2xx
    Status(u16),
    /// 连接失败
    Unreachable,
}

pub struct MockSource {
    list: Mutex<MockReply>,
    items: Mutex<HashMap<ItemId, MockReply>>,
    delay: Duration,
    pub list_calls: AtomicUsize,
    pub item_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub fn story_json(id: ItemId, title: &str, url: &str, by: &str) -> Vec<u8> {
    serde_json::json!({
        "id": id,
        "type": "story",
        "by": by,
        "title": title,
        "url": url,
        "time": 1_700_000_000 + id as i64,
        "score": 1,
    })
    .to_string()
    .into_bytes()
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            list: Mutex::new(MockReply::Body(b"[]".to_vec())),
            items: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            list_calls: AtomicUsize::new(0),
            item_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// 以 (id, title, url, author) 构造 id 列表与对应条目
    pub fn with_stories(stories: &[(ItemId, &str, &str, &str)]) -> Self {
        let src = Self::new();
        let ids: Vec<ItemId> = stories.iter().map(|s| s.0).collect();
        src.set_list(MockReply::Body(serde_json::to_vec(&ids).unwrap()));
        for (id, title, url, by) in stories {
            src.set_item(*id, MockReply::Body(story_json(*id, title, url, by)));
        }
        src
    }

    /// n 条带 url 的 story，id 为 1..=n
    pub fn with_numbered(n: u64) -> Self {
        let src = Self::new();
        let ids: Vec<ItemId> = (1..=n).collect();
        src.set_list(MockReply::Body(serde_json::to_vec(&ids).unwrap()));
        for id in ids {
            let url = format!("https://example.com/{}", id);
            src.set_item(
                id,
                MockReply::Body(story_json(id, &format!("story {}", id), &url, "mock")),
            );
        }
        src
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_list(&self, reply: MockReply) {
        *self.list.lock() = reply;
    }

    pub fn set_item(&self, id: ItemId, reply: MockReply) {
        self.items.lock().insert(id, reply);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    async fn list_identifiers(&self) -> Result<Vec<u8>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let url = "mock://newstories.json".to_string();
        let reply = self.list.lock().clone();
        match reply {
            MockReply::Body(b) => Ok(b),
            MockReply::Status(status) => Err(FetchError::Status { url, status }),
            MockReply::Unreachable => Err(FetchError::Transport {
                url,
                reason: "connection refused".into(),
            }),
        }
    }

    async fn fetch_record(&self, id: ItemId) -> Result<Option<Vec<u8>>, FetchError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.items.lock().get(&id).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Some(MockReply::Body(b)) => Ok(Some(b)),
            Some(MockReply::Status(_)) | None => Ok(None),
            Some(MockReply::Unreachable) => Err(FetchError::Transport {
                url: format!("mock://item/{}.json", id),
                reason: "connection reset".into(),
            }),
        }
    }
}
