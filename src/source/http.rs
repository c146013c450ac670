use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::ItemId;
use crate::error::FetchError;
use crate::source::client::RemoteSource;

const USER_AGENT: &str = concat!("hn-newest/", env!("CARGO_PKG_VERSION"));

/// 基于 reqwest 的上游客户端（Hacker News Firebase API 布局）
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_url(&self) -> String {
        format!("{}newstories.json", self.base_url)
    }

    pub fn item_url(&self, id: ItemId) -> String {
        format!("{}item/{}.json", self.base_url, id)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(url, &e))
    }
}

fn transport(url: &str, e: &reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn list_identifiers(&self) -> Result<Vec<u8>, FetchError> {
        let url = self.list_url();
        let resp = self.get(&url).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| transport(&url, &e))?;
        Ok(body.to_vec())
    }

    async fn fetch_record(&self, id: ItemId) -> Result<Option<Vec<u8>>, FetchError> {
        let url = self.item_url(id);
        let resp = self.get(&url).await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!("item {} unavailable: {} returned {}", id, url, status);
            return Ok(None);
        }

        let body = resp.bytes().await.map_err(|e| transport(&url, &e))?;
        Ok(Some(body.to_vec()))
    }
}
