//! 服务配置：`config.toml` + 命令行覆盖。
//!
//! ```toml
//! base_url = "https://hacker-news.firebaseio.com/v0/"
//! cache_ttl_secs = 600
//! fetch_concurrency = 10
//! page_size = 10
//! request_timeout_secs = 30
//! single_flight = false
//! listen = "0.0.0.0:6060"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0/";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 10;
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// 上游 API 根地址（以 `/` 结尾）
    pub base_url: String,
    pub cache_ttl_secs: u64,
    /// 扇出阶段同时在途的请求上限
    pub fetch_concurrency: usize,
    /// 分页默认值，同时也是下限
    pub page_size: usize,
    pub request_timeout_secs: u64,
    /// 开启后同一 key 的并发 miss 只计算一次
    pub single_flight: bool,
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
            single_flight: false,
            listen: "0.0.0.0:6060".to_string(),
        }
    }
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn from_toml_str(s: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        cfg.validate()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// 显式路径优先；否则尝试 `<config_dir>/hn-newest/config.toml`，不存在则用默认值
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(p) = explicit {
            return Self::load(p);
        }
        match default_config_path() {
            Some(p) if p.exists() => {
                tracing::info!("Loading config from {}", p.display());
                Self::load(&p)
            }
            _ => Ok(Self::default()),
        }
    }

    /// 规整 base_url 并拒绝无意义的取值
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "fetch_concurrency must be at least 1".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        Ok(self)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hn-newest").join(CONFIG_FILE_NAME))
}
