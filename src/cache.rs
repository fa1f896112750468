//! 解析结果缓存。
//!
//! 以规范化后的链接为键，保存解析得到的 [`Track`]。提供三项保证：
//!
//! - **容量上限**：超过 `max_size` 时淘汰最久未被访问的条目 (LRU)。
//! - **访问后过期**：条目在最后一次访问（读取或写入）后超过 `expire_after_access`
//!   未被使用，即视为不存在。
//! - **单飞**：同一个键上并发的多个请求只会执行一次加载，所有等待者拿到
//!   同一个结果或同一个错误。加载失败不会留下任何条目，下一次请求会重新加载。
//!   加载任务发生 panic 时按 `SonglinkError::Internal` 处理，同样不会留下条目。

use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    error::{Result, SonglinkError},
    model::Track,
};

type Loading = Shared<BoxFuture<'static, Result<Arc<Track>>>>;

struct Entry {
    track: Arc<Track>,
    last_access: Instant,
    /// 单调递增的访问序号，用于 LRU 排序。
    seq: u64,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    loading: HashMap<String, Loading>,
    next_seq: u64,
}

impl State {
    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// 读取并刷新条目的访问时间；已过期的条目会被移除。
    fn touch(&mut self, key: &str, now: Instant, ttl: Duration) -> Option<Arc<Track>> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.last_access) > ttl,
            None => return None,
        };
        if expired {
            trace!("[Cache] 条目 '{}' 已过期", key);
            self.entries.remove(key);
            return None;
        }

        let seq = self.bump();
        let entry = self.entries.get_mut(key)?;
        entry.last_access = now;
        entry.seq = seq;
        Some(Arc::clone(&entry.track))
    }

    fn purge_expired(&mut self, now: Instant, ttl: Duration) {
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_access) <= ttl);
    }

    fn insert(&mut self, key: String, track: Arc<Track>, now: Instant, max_size: usize) {
        let seq = self.bump();
        self.entries.insert(
            key,
            Entry {
                track,
                last_access: now,
                seq,
            },
        );

        while self.entries.len() > max_size {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            debug!("[Cache] 容量已满，淘汰条目 '{}'", oldest);
            self.entries.remove(&oldest);
        }
    }
}

/// 带容量上限、访问后过期与单飞语义的解析结果缓存。
///
/// 克隆得到的是同一份缓存的句柄。
#[derive(Clone)]
pub struct ResolverCache {
    state: Arc<Mutex<State>>,
    max_size: usize,
    expire_after_access: Duration,
}

impl ResolverCache {
    /// 创建一个新的缓存。
    ///
    /// # 参数
    /// * `max_size` - 最多保留的条目数。
    /// * `expire_after_access` - 条目在最后一次访问后的存活时间。
    pub fn new(max_size: usize, expire_after_access: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            max_size,
            expire_after_access,
        }
    }

    /// 读取一个未过期的条目，并刷新它的访问时间。
    pub fn get(&self, key: &str) -> Option<Arc<Track>> {
        self.state
            .lock()
            .touch(key, Instant::now(), self.expire_after_access)
    }

    /// 读取缓存；未命中时执行 `loader` 并缓存其成功结果。
    ///
    /// 同一个键上已有加载在进行时，不会调用 `loader`，而是等待那次加载的结果。
    /// `loader` 在内部锁内被调用，它应当只负责构造 future，真正的工作放在 future 里。
    ///
    /// # 错误
    /// 返回加载过程中产生的错误。所有等待同一次加载的调用方收到相同的错误，
    /// 且该键不会被缓存。
    pub async fn get_or_compute<F, Fut>(&self, key: &str, loader: F) -> Result<Arc<Track>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Track>> + Send + 'static,
    {
        let loading = {
            let mut state = self.state.lock();
            if let Some(track) = state.touch(key, Instant::now(), self.expire_after_access) {
                trace!("[Cache] 命中 '{}'", key);
                return Ok(track);
            }

            match state.loading.get(key) {
                Some(loading) => {
                    debug!("[Cache] '{}' 正在加载中，等待已有的请求", key);
                    loading.clone()
                }
                None => {
                    debug!("[Cache] 未命中 '{}'，开始加载", key);
                    let loading = AssertUnwindSafe(loader())
                        .catch_unwind()
                        .map(|outcome| match outcome {
                            Ok(result) => result.map(Arc::new),
                            Err(payload) => Err(panic_to_error(payload)),
                        })
                        .boxed()
                        .shared();
                    state.loading.insert(key.to_string(), loading.clone());
                    loading
                }
            }
        };

        let result = loading.clone().await;

        let mut state = self.state.lock();
        if state
            .loading
            .get(key)
            .is_some_and(|current| current.ptr_eq(&loading))
        {
            state.loading.remove(key);
            if let Ok(track) = &result {
                let now = Instant::now();
                state.purge_expired(now, self.expire_after_access);
                state.insert(key.to_string(), Arc::clone(track), now, self.max_size);
            }
        }

        result
    }

    /// 移除一个条目。正在进行中的加载不受影响。
    pub fn invalidate(&self, key: &str) {
        self.state.lock().entries.remove(key);
    }

    /// 清空所有条目。
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// 当前未过期的条目数量。
    pub fn len(&self) -> usize {
        let mut state = self.state.lock();
        state.purge_expired(Instant::now(), self.expire_after_access);
        state.entries.len()
    }

    /// 缓存是否为空。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_to_error(payload: Box<dyn Any + Send>) -> SonglinkError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "未知的 panic".to_string());
    warn!("[Cache] 加载任务发生 panic: {}", message);
    SonglinkError::Internal(format!("加载任务发生 panic: {message}"))
}

impl std::fmt::Debug for ResolverCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverCache")
            .field("max_size", &self.max_size)
            .field("expire_after_access", &self.expire_after_access)
            .finish_non_exhaustive()
    }
}
