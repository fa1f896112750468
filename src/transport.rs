//! 传输层抽象。
//!
//! 核心只依赖“给定 URL 与 User-Agent，取回原始字节”这一能力。
//! 超时、代理、TLS 等都属于具体实现的职责；核心不做任何重试。

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::{instrument, trace};

use crate::error::{Result, SonglinkError};

/// 定义了所有传输实现需要实现的通用接口。
#[async_trait]
pub trait Transport: Send + Sync {
    ///
    /// 以 GET 方式请求 `url` 并返回响应体。
    ///
    /// # 参数
    /// * `url` - 完整的请求地址。
    /// * `user_agent` - 要发送的 `User-Agent` 头。
    ///
    /// # 返回
    /// 成功时返回原始响应字节；网络错误或非 2xx 状态码返回传输类错误。
    ///
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>>;
}

/// 基于 `reqwest` 的默认传输实现。
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 使用默认的 `reqwest::Client` 创建传输。
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用调用方配置好的 `reqwest::Client`（例如设置了超时或代理）创建传输。
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip_all)]
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await?;

        let status = response.status();
        trace!(status = %status, "收到 Songlink 响应");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SonglinkError::Transport(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
