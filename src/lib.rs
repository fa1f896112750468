#![warn(missing_docs)]

//! # Songlink RS
//!
//! Songlink (Odesli) API 的 Rust 客户端：把任意平台的音乐链接解析为
//! 同一首歌/专辑在所有平台上的统一表示。
//!
//! 请注意，本库只是一个封装。使用 Songlink 服务时，署名与遵守其服务条款是你自己的责任。
//!
//! ## 主要功能
//!
//! - **强类型模型**: 平台 ([`Platform`])、API 提供商 ([`ApiProvider`])、链接与元数据。
//!   遇到无法识别的标识符时会直接报错，而不是静默忽略。
//! - **缓存**: 以规范化后的链接为键，LRU 容量上限 + 访问后过期。
//!   同一个键上的并发请求只会向上游发送一次。
//! - **三种调用方式**: `resolve().await`、阻塞的 `resolve_blocking()`，
//!   以及在工作线程上回调的 `resolve_with()`。
//!
//! ## 解析链接
//!
//! ```rust,no_run
//! use songlink_rs::{Platform, Songlink};
//!
//! async {
//!     let songlink = Songlink::builder().country("gb").build().unwrap();
//!
//!     match songlink.resolve("https://open.spotify.com/track/0Jcij1eWd5bDMU5iPbxe2i").await {
//!         Ok(track) => {
//!             if let Some(apple) = track.platform(Platform::AppleMusic) {
//!                 println!("Apple Music: {}", apple.links.url);
//!             }
//!         }
//!         Err(e) => eprintln!("解析失败: {}", e),
//!     }
//! };
//! ```
//!
//! ## 非阻塞回调
//!
//! ```rust,no_run
//! use songlink_rs::Songlink;
//!
//! let songlink = Songlink::builder().build().unwrap();
//! songlink.resolve_with(
//!     "https://music.apple.com/gb/album/_/1?i=1",
//!     |track| println!("共匹配到 {} 个平台", track.len()),
//!     |error| eprintln!("解析失败: {}", error),
//! );
//! ```
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod pool;
pub mod transport;

use std::sync::Arc;

use image::RgbaImage;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use crate::{
    config::{SonglinkBuilder, SonglinkConfig},
    error::{IdentifierKind, Result, SonglinkError},
    model::{ApiProvider, EntityType, Links, Metadata, Platform, PlatformTrack, Thumbnail, Track},
    pool::WorkerPool,
    transport::{ReqwestTransport, Transport},
};

use crate::{api::mapper, cache::ResolverCache};

// ==========================================================
//  顶层 API
// ==========================================================

/// Songlink 客户端，是与本库交互的主要入口点。
///
/// 配置在构建时确定，此后不可变。实例内部持有缓存，应当长期保留并在调用点之间共享；
/// 克隆得到的实例共享同一份缓存与传输实现。
#[derive(Clone)]
pub struct Songlink {
    config: Arc<SonglinkConfig>,
    transport: Arc<dyn Transport>,
    cache: ResolverCache,
    pool: Option<WorkerPool>,
}

impl Songlink {
    /// 创建一个新的构建器。
    pub fn builder() -> SonglinkBuilder {
        SonglinkBuilder::new()
    }

    /// 使用给定配置和默认的 `reqwest` 传输创建实例。
    ///
    /// # 错误
    /// 配置无效时返回 `SonglinkError::InvalidConfig`。
    pub fn new(config: SonglinkConfig) -> Result<Self> {
        SonglinkBuilder::from_config(config).build()
    }

    pub(crate) fn from_parts(
        config: SonglinkConfig,
        transport: Arc<dyn Transport>,
        pool: Option<WorkerPool>,
    ) -> Self {
        let cache = ResolverCache::new(config.cache_size, config.cache_duration);
        Self {
            config: Arc::new(config),
            transport,
            cache,
            pool,
        }
    }

    /// 当前使用的配置。
    pub fn config(&self) -> &SonglinkConfig {
        &self.config
    }

    /// 返回解析 `uri` 时会请求的上游地址。
    pub fn request_url(&self, uri: &str) -> Result<String> {
        let encoded = api::normalize_uri(uri)?;
        Ok(self.request_url_for(&encoded))
    }

    fn request_url_for(&self, encoded_uri: &str) -> String {
        api::build_request_url(
            &self.config.endpoint,
            encoded_uri,
            &self.config.country_code,
            self.config.api_key.as_deref(),
        )
    }

    /// 解析一个链接。
    ///
    /// 链接会被自动编码。命中缓存时不会发出任何请求；同一个链接上并发的
    /// 多次调用只会请求上游一次，并得到同一个 `Track`。
    ///
    /// # 返回
    /// 成功时返回解析得到的 `Track`（绝不会是空结果）。
    ///
    /// # 错误
    /// 传输、响应格式或无法识别的标识符等错误会原样返回，不做任何重试。
    #[instrument(skip(self))]
    pub async fn resolve(&self, uri: &str) -> Result<Arc<Track>> {
        let key = api::normalize_uri(uri)?;
        let request_url = self.request_url_for(&key);
        let transport = Arc::clone(&self.transport);
        let config = Arc::clone(&self.config);
        let source = uri.trim().to_string();

        self.cache
            .get_or_compute(&key, move || async move {
                info!(
                    "[Songlink] 正在向上游请求 '{}' (国家: {})",
                    source, config.country_code
                );
                let bytes = transport.fetch(&request_url, &config.user_agent).await?;
                mapper::parse_response(&bytes).inspect_err(|e| {
                    warn!("[Songlink] 解析 '{}' 的响应失败: {}", source, e);
                })
            })
            .await
    }

    /// 阻塞地解析一个链接。
    ///
    /// **这个方法会阻塞调用它的线程**，一般情况下应当使用 [`Songlink::resolve`]
    /// 或 [`Songlink::resolve_with`]。
    ///
    /// 在多线程 tokio 运行时内部（包括 `spawn_blocking` 线程）可以调用，
    /// 会通过 `block_in_place` 让出执行器。
    ///
    /// # 错误
    /// 除 [`Songlink::resolve`] 的错误外，在单线程 (`current_thread`) 运行时内部调用时返回
    /// `SonglinkError::InvalidInput`。
    pub fn resolve_blocking(&self, uri: &str) -> Result<Arc<Track>> {
        self.pool()?.block_on(self.resolve(uri))?
    }

    /// 在工作线程池上解析一个链接，并在完成后回调。
    ///
    /// 两个回调中恰好有一个会被调用，且只调用一次；回调总是在工作线程上执行，
    /// 绝不会在本方法返回前于调用方线程上同步执行。提交后无法取消。
    ///
    /// # 参数
    /// * `uri` - 要解析的链接（会被自动编码）。
    /// * `on_success` - 解析成功时收到 `Track`。
    /// * `on_failure` - 解析失败时收到错误。
    pub fn resolve_with<S, F>(&self, uri: &str, on_success: S, on_failure: F)
    where
        S: FnOnce(Arc<Track>) + Send + 'static,
        F: FnOnce(SonglinkError) + Send + 'static,
    {
        let pool = match self.pool() {
            Ok(pool) => pool,
            Err(e) => {
                warn!("[Songlink] 无法获取工作线程池: {}", e);
                std::thread::spawn(move || on_failure(e));
                return;
            }
        };

        let this = self.clone();
        let uri = uri.to_string();
        pool.spawn(async move {
            match this.resolve(&uri).await {
                Ok(track) => on_success(track),
                Err(e) => on_failure(e),
            }
        });
    }

    /// 在工作线程池上解析一个链接，返回可等待的任务句柄。
    pub fn spawn_resolve(&self, uri: &str) -> Result<JoinHandle<Result<Arc<Track>>>> {
        let pool = self.pool()?;
        let this = self.clone();
        let uri = uri.to_string();
        Ok(pool.spawn(async move { this.resolve(&uri).await }))
    }

    /// 下载并解码缩略图，结果缓存在 `thumbnail` 上。
    ///
    /// 已加载过的缩略图直接返回，不会再次请求。
    ///
    /// # 错误
    /// 下载失败返回传输类错误；解码失败返回 `SonglinkError::ImageDecode`。
    /// 这些错误只影响缩略图本身。
    pub async fn load_thumbnail<'a>(&self, thumbnail: &'a Thumbnail) -> Result<&'a RgbaImage> {
        if let Some(image) = thumbnail.image() {
            return Ok(image);
        }
        debug!("[Songlink] 正在下载缩略图 {}", thumbnail.url);
        let bytes = self
            .transport
            .fetch(&thumbnail.url, &self.config.user_agent)
            .await?;
        thumbnail.decode(&bytes)
    }

    /// 缓存中未过期的条目数量。
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// 从缓存中移除某个链接的解析结果。
    pub fn invalidate(&self, uri: &str) -> Result<()> {
        self.cache.invalidate(&api::normalize_uri(uri)?);
        Ok(())
    }

    /// 清空缓存。已经返回给调用方的 `Track` 不受影响。
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn pool(&self) -> Result<WorkerPool> {
        match &self.pool {
            Some(pool) => Ok(pool.clone()),
            None => WorkerPool::shared(),
        }
    }
}

impl std::fmt::Debug for Songlink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Songlink")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
