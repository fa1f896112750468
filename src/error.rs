//! 定义了整个 `songlink-rs` 库的错误类型 `SonglinkError`。

use std::sync::Arc;

use thiserror::Error;

/// 无法识别的标识符所属的类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// 平台标识符（`linksByPlatform` 的键、实体的 `platforms` 数组）。
    Platform,
    /// API 提供商标识符（实体的 `apiProvider` 字段）。
    ApiProvider,
    /// 实体类型（实体的 `type` 字段）。
    EntityType,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Platform => "Platform",
            Self::ApiProvider => "ApiProvider",
            Self::EntityType => "EntityType",
        };
        f.write_str(name)
    }
}

/// `songlink-rs` 库的通用错误枚举。
///
/// 该类型实现了 `Clone`：同一个键上并发等待的所有调用方会收到同一个错误。
/// 无法克隆的底层错误因此被包在 `Arc` 中。
#[derive(Error, Debug, Clone)]
pub enum SonglinkError {
    /// 网络请求失败 (源自 `reqwest::Error`)
    #[error("网络请求失败: {0}")]
    Reqwest(Arc<reqwest::Error>),

    /// 传输层失败，例如非 2xx 的 HTTP 状态码（包括被限流的 429）
    #[error("传输失败: {0}")]
    Transport(String),

    /// 响应缺少必需字段、字段类型错误或根本不是合法的 JSON
    #[error("响应格式错误: {0}")]
    MalformedResponse(String),

    /// 响应中出现了客户端模型不认识的标识符，通常意味着上游新增了平台
    #[error("无法识别的 {kind} 标识符: '{identifier}'")]
    UnrecognizedIdentifier {
        /// 标识符所属的类别。
        kind: IdentifierKind,
        /// 原始的标识符字符串。
        identifier: String,
    },

    /// 缩略图解码失败 (源自 `image::ImageError`)
    #[error("缩略图解码失败: {0}")]
    ImageDecode(Arc<image::ImageError>),

    /// 配置无效
    #[error("配置无效: {0}")]
    InvalidConfig(String),

    /// 调用参数无效
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// I/O 错误 (源自 `io::Error`)
    #[error("I/O 错误: {0}")]
    Io(Arc<std::io::Error>),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// `SonglinkError` 的 `Result` 类型别名，方便在函数签名中使用。
pub type Result<T> = std::result::Result<T, SonglinkError>;

impl SonglinkError {
    pub(crate) fn unrecognized(kind: IdentifierKind, identifier: impl Into<String>) -> Self {
        Self::UnrecognizedIdentifier {
            kind,
            identifier: identifier.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// 错误是否来自传输层。
    ///
    /// 核心从不重试；调用方可以据此决定是否自行重试。
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Reqwest(_) | Self::Transport(_))
    }
}

impl From<reqwest::Error> for SonglinkError {
    fn from(err: reqwest::Error) -> Self {
        Self::Reqwest(Arc::new(err))
    }
}

impl From<serde_json::Error> for SonglinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

impl From<image::ImageError> for SonglinkError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageDecode(Arc::new(err))
    }
}

impl From<std::io::Error> for SonglinkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
