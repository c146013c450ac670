use std::fmt;

use thiserror::Error;

/// 单次拉取周期内各阶段的错误。
///
/// 单条目返回非 2xx（ItemUnavailable）不在此列：扇出阶段直接吸收并丢弃该条目。
#[derive(Debug, Error)]
pub enum FetchError {
    /// 连接失败 / 超时 / 读取 body 失败
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// id 列表接口返回非 2xx
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("unable to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no items found")]
    EmptyResult,

    /// 扇出任务 panic 或被取消
    #[error("fetch task failed: {0}")]
    Task(String),
}

/// 供调用方分支处理的错误类别，避免匹配错误字符串
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    EmptyResult,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "decode",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::Internal => "internal",
        }
    }
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport { .. } | FetchError::Status { .. } => ErrorKind::Transport,
            FetchError::Decode { .. } => ErrorKind::Decode,
            FetchError::EmptyResult => ErrorKind::EmptyResult,
            FetchError::Task(_) => ErrorKind::Internal,
        }
    }
}

/// 失败发生在流水线的哪个阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Identifiers,
    Records,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Identifiers => f.write_str("identifier list"),
            Stage::Records => f.write_str("item records"),
        }
    }
}

/// 流水线对外暴露的唯一错误类型
#[derive(Debug, Error)]
#[error("error retrieving newest items: {stage}: {source}")]
pub struct RetrievalError {
    pub stage: Stage,
    #[source]
    pub source: FetchError,
}

impl RetrievalError {
    pub fn new(stage: Stage, source: FetchError) -> Self {
        Self { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}
