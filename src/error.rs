use thiserror::Error;

use crate::assertion::AssertionError;

#[derive(Error, Debug)]
pub enum HatestError {
    /// 某条断言规则失败（携带 expected / actual）
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// 网络层错误，不经过断言规则
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 终止回调 panic 或返回了错误
    #[error("{0}")]
    Callback(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to bind test server: {0}")]
    Bind(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl HatestError {
    pub fn is_assertion(&self) -> bool {
        matches!(self, HatestError::Assertion(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, HatestError::Transport(_))
    }

    /// 断言失败时的期望值，其它错误为 None
    pub fn expected(&self) -> Option<&str> {
        match self {
            HatestError::Assertion(err) => err.expected.as_deref(),
            _ => None,
        }
    }

    /// 断言失败时的实际值，其它错误为 None
    pub fn actual(&self) -> Option<&str> {
        match self {
            HatestError::Assertion(err) => err.actual.as_deref(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for HatestError {
    fn from(err: anyhow::Error) -> Self {
        HatestError::Other(err.to_string())
    }
}

/// 传输层错误
///
/// 消息文本沿用 Node 风格，便于在测试里直接比较。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("socket hang up")]
    SocketHangUp,

    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    #[error("connect ECONNREFUSED {0}")]
    ConnectionRefused(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

/// Result type for hatest crate
pub type Result<T> = std::result::Result<T, HatestError>;
